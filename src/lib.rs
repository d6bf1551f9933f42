//! Turn an extended shell history log into work sessions.
//!
//! The pipeline is [`parser`] (log to [`types::CommandRecord`]s with inferred
//! directories and categories), then [`segmenter`] (records to
//! [`types::Session`]s), with [`description`] naming each session.

pub mod analysis;
pub mod categorizer;
pub mod config;
pub mod description;
pub mod error;
pub mod logging;
pub mod parser;
pub mod segmenter;
pub mod types;
pub mod utils;

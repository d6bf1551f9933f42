use super::*;

#[test]
fn test_format_number_comma() {
    let options = NumberFormatOptions {
        use_comma: true,
        locale: "en".to_string(),
    };

    assert_eq!(format_number(1000u64, &options), "1,000");
    assert_eq!(format_number(1000000u64, &options), "1,000,000");
    assert_eq!(format_number(123u64, &options), "123");
}

#[test]
fn test_format_number_locale() {
    let options = NumberFormatOptions {
        use_comma: true,
        locale: "de".to_string(),
    };

    assert_eq!(format_number(1234567u64, &options), "1.234.567");
}

#[test]
fn test_format_number_plain() {
    let options = NumberFormatOptions {
        use_comma: false,
        locale: "en".to_string(),
    };

    assert_eq!(format_number(1000u64, &options), "1000");
}

#[test]
fn test_options_from_formatting_config() {
    let formatting = FormattingConfig {
        number_comma: true,
        locale: "fr".to_string(),
    };
    let options = NumberFormatOptions::from(&formatting);

    assert!(options.use_comma);
    assert_eq!(options.locale, "fr");
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(0), "0s");
    assert_eq!(format_duration(59), "59s");
    assert_eq!(format_duration(60), "1m");
    assert_eq!(format_duration(59 * 60 + 59), "59m");
    assert_eq!(format_duration(3600), "1h 00m");
    assert_eq!(format_duration(2 * 3600 + 5 * 60), "2h 05m");
    assert_eq!(format_duration(-5), "0s");
}

#[test]
fn test_parse_date() {
    assert_eq!(
        parse_date("2025-01-31"),
        Ok(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap())
    );
    assert!(parse_date("31/01/2025").is_err());
    assert!(parse_date("2025-02-30").is_err());
}

#[test]
fn test_warn_once_deduplicates() {
    // Only observable through the cache; repeated calls must not panic or grow it.
    warn_once("duplicate warning for test");
    warn_once("duplicate warning for test");

    let cache = WARNED_MESSAGES.get().expect("cache initialised");
    let warned = cache.lock().expect("lock");
    assert!(warned.contains("duplicate warning for test"));
    assert_eq!(
        warned
            .iter()
            .filter(|m| m.as_str() == "duplicate warning for test")
            .count(),
        1
    );
}

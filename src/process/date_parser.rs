use chrono::NaiveDate;

/// Format of the `Sample date` column, e.g. "Jan 5, 2024".
const SAMPLE_DATE_FORMAT: &str = "%b %d, %Y";

/// Parse a creel sample date. Returns `None` for empty or malformed input,
/// including impossible calendar dates such as "Feb 30, 2024".
pub fn parse_sample_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, SAMPLE_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_format() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_sample_date("Jan 5, 2024"), Some(d));
        assert_eq!(parse_sample_date("Jan 05, 2024"), Some(d));
        assert_eq!(parse_sample_date("  Jan 5, 2024 "), Some(d));
        assert_eq!(
            parse_sample_date("Dec 31, 2023"),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
    }

    #[test]
    fn rejects_other_formats() {
        assert_eq!(parse_sample_date("13/45/2024"), None);
        assert_eq!(parse_sample_date("2024-01-05"), None);
        assert_eq!(parse_sample_date("Feb 30, 2024"), None);
        assert_eq!(parse_sample_date("Jan 5"), None);
        assert_eq!(parse_sample_date(""), None);
    }
}

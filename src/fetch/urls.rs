// src/fetch/urls.rs
use anyhow::{Context, Result};
use url::Url;

/// Query parameter WDFW uses to select a reporting year.
pub const SAMPLE_DATE_QUERY_KEY: &str = "sample_date";

/// Effective export URL: `base`, plus `sample_date=<selector>` when a
/// selector is configured. Existing query parameters are preserved.
pub fn build_source_url(base: &str, selector: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("parsing source URL {}", base))?;
    if let Some(selector) = selector {
        url.query_pairs_mut()
            .append_pair(SAMPLE_DATE_QUERY_KEY, selector);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_selector_to_existing_query() -> Result<()> {
        let url = build_source_url(
            "https://wdfw.wa.gov/fishing/reports/creel/puget-annual/export?_format=csv",
            Some("2024"),
        )?;
        assert_eq!(
            url.as_str(),
            "https://wdfw.wa.gov/fishing/reports/creel/puget-annual/export?_format=csv&sample_date=2024"
        );
        Ok(())
    }

    #[test]
    fn starts_query_when_absent_and_encodes() -> Result<()> {
        let url = build_source_url("http://localhost:8080/creel.csv", Some("2024 & 2025"))?;
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/creel.csv?sample_date=2024+%26+2025"
        );
        Ok(())
    }

    #[test]
    fn leaves_url_alone_without_selector() -> Result<()> {
        let url = build_source_url("http://localhost:8080/creel.csv", None)?;
        assert_eq!(url.as_str(), "http://localhost:8080/creel.csv");
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        assert!(build_source_url("not a url", None).is_err());
    }
}

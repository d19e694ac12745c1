// src/fetch/mod.rs

pub mod urls;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::{fmt, path::PathBuf, time::Duration};
use tokio_util::io::ReaderStream;
use tracing::{info, instrument};
use url::Url;

use crate::{config::Config, process::csv_stream::ByteStream};

/// Where the creel export is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Http(Url),
    File(PathBuf),
}

impl Source {
    /// A local `CSV_PATH` wins over the download URL.
    pub fn from_config(config: &Config) -> Result<Self> {
        if let Some(path) = &config.csv_path {
            return Ok(Source::File(path.clone()));
        }
        let url = urls::build_source_url(&config.csv_url, config.sample_date_param.as_deref())?;
        Ok(Source::Http(url))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Http(url) => write!(f, "{}", url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// HTTP client used for the export download.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")
}

/// Open `source` as a stream of byte chunks. Nothing is buffered beyond the
/// chunk in flight; a non-success HTTP status is an error.
#[instrument(level = "info", skip(client, source), fields(source = %source))]
pub async fn open_source(client: &Client, source: &Source) -> Result<ByteStream> {
    match source {
        Source::Http(url) => {
            let resp = client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("GET {}", url))?
                .error_for_status()
                .with_context(|| format!("non-success status from {}", url))?;
            info!(
                status = %resp.status(),
                content_length = ?resp.content_length(),
                "source stream opened"
            );
            Ok(resp
                .bytes_stream()
                .map(|chunk| chunk.context("reading response body"))
                .boxed())
        }
        Source::File(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            info!(path = %path.display(), "source file opened");
            Ok(ReaderStream::new(file)
                .map(|chunk| chunk.context("reading source file"))
                .boxed())
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn drain(mut stream: ByteStream) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    #[test]
    fn csv_path_wins_over_url() -> Result<()> {
        let mut cfg = Config {
            sample_date_param: Some("2023".into()),
            ..Config::default()
        };
        match Source::from_config(&cfg)? {
            Source::Http(url) => assert!(url.as_str().ends_with("sample_date=2023")),
            other => panic!("unexpected source {:?}", other),
        }
        cfg.csv_path = Some(PathBuf::from("local.csv"));
        assert_eq!(
            Source::from_config(&cfg)?,
            Source::File(PathBuf::from("local.csv"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn streams_http_body() -> Result<()> {
        let (base, server) = test_server::serve("200 OK", "a,b\n1,2\n".into(), 1).await;
        let url = urls::build_source_url(&format!("{}/export?_format=csv", base), Some("2024"))?;
        let stream = open_source(&http_client()?, &Source::Http(url)).await?;
        assert_eq!(drain(stream).await?, b"a,b\n1,2\n");

        let requests = server.await?;
        assert_eq!(
            requests,
            vec!["GET /export?_format=csv&sample_date=2024 HTTP/1.1".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn http_error_status_fails() -> Result<()> {
        let (base, _server) =
            test_server::serve("503 Service Unavailable", String::new(), 1).await;
        let url = urls::build_source_url(&base, None)?;
        let err = match open_source(&http_client()?, &Source::Http(url)).await {
            Ok(_) => panic!("expected a fetch failure"),
            Err(e) => e,
        };
        assert!(format!("{:#}", err).contains("non-success status"));
        Ok(())
    }

    #[tokio::test]
    async fn streams_local_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"Sample date\nJan 5, 2024\n")?;
        let stream = open_source(&http_client()?, &Source::File(file.path().into())).await?;
        assert_eq!(drain(stream).await?, b"Sample date\nJan 5, 2024\n");
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_fails() -> Result<()> {
        let source = Source::File(PathBuf::from("/definitely/not/here.csv"));
        assert!(open_source(&http_client()?, &source).await.is_err());
        Ok(())
    }
}

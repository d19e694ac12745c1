// src/process/csv_stream.rs

use anyhow::{Context, Result};
use bytes::Bytes;
use csv_core::{ReadRecordResult, Reader};
use futures::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::model::columns;

/// Source bytes, as delivered by the network or the filesystem.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// One CSV record keyed by the header row. Values are trimmed.
#[derive(Debug, Clone)]
pub struct RawRow {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RawRow {
    pub fn new(headers: Arc<[String]>, values: Vec<String>) -> Self {
        Self { headers, values }
    }

    /// Value of `column`, or `None` if the header is absent or the record is short.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.values.get(idx).map(String::as_str)
    }
}

/// Incremental CSV reader fed by a byte stream. Memory stays bounded by the
/// largest record, never the whole document.
///
/// The first record is the header row. Fields are trimmed, blank records are
/// skipped and records with a differing field count are tolerated.
pub struct CsvRowStream {
    chunks: ByteStream,
    core: Reader,
    chunk: Bytes,
    pos: usize,
    eof: bool,
    output: Vec<u8>,
    ends: Vec<usize>,
    headers: Option<Arc<[String]>>,
    records: u64,
}

impl CsvRowStream {
    pub fn new(chunks: ByteStream) -> Self {
        Self {
            chunks,
            core: Reader::new(),
            chunk: Bytes::new(),
            pos: 0,
            eof: false,
            output: vec![0; 4 * 1024],
            ends: vec![0; 32],
            headers: None,
            records: 0,
        }
    }

    /// Reads the header row if not done yet. `None` for an empty document.
    pub async fn headers(&mut self) -> Result<Option<Arc<[String]>>> {
        if self.headers.is_none() {
            let Some(mut fields) = self.next_record().await? else {
                return Ok(None);
            };
            if let Some(first) = fields.first_mut() {
                if let Some(stripped) = first.strip_prefix('\u{feff}') {
                    *first = stripped.trim().to_string();
                }
            }
            for required in columns::REQUIRED {
                if !fields.iter().any(|h| h == required) {
                    warn!(column = required, "source header is missing a required column");
                }
            }
            debug!(columns = fields.len(), "read CSV header");
            self.headers = Some(fields.into());
        }
        Ok(self.headers.clone())
    }

    /// Next data row, `None` at end of stream.
    pub async fn next_row(&mut self) -> Result<Option<RawRow>> {
        let Some(headers) = self.headers().await? else {
            return Ok(None);
        };
        while let Some(values) = self.next_record().await? {
            if values.iter().all(String::is_empty) {
                trace!(record = self.records, "skipping blank record");
                continue;
            }
            return Ok(Some(RawRow::new(headers.clone(), values)));
        }
        Ok(None)
    }

    /// Drives the push parser until one full record is available.
    async fn next_record(&mut self) -> Result<Option<Vec<String>>> {
        let mut outlen = 0;
        let mut endlen = 0;
        loop {
            if self.pos >= self.chunk.len() && !self.eof {
                match self.chunks.next().await {
                    Some(chunk) => {
                        self.chunk = chunk.context("reading source stream")?;
                        self.pos = 0;
                        continue;
                    }
                    None => self.eof = true,
                }
            }

            let input = &self.chunk[self.pos..];
            let (res, nin, nout, nend) = self.core.read_record(
                input,
                &mut self.output[outlen..],
                &mut self.ends[endlen..],
            );
            self.pos += nin;
            outlen += nout;
            endlen += nend;

            match res {
                ReadRecordResult::InputEmpty if self.eof => return Ok(None),
                ReadRecordResult::InputEmpty => {}
                ReadRecordResult::OutputFull => {
                    let len = self.output.len();
                    self.output.resize(len * 2, 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    let len = self.ends.len();
                    self.ends.resize(len * 2, 0);
                }
                ReadRecordResult::Record => {
                    self.records += 1;
                    return Ok(Some(self.fields(endlen)));
                }
                ReadRecordResult::End => return Ok(None),
            }
        }
    }

    fn fields(&self, nfields: usize) -> Vec<String> {
        let mut start = 0;
        self.ends[..nfields]
            .iter()
            .map(|&end| {
                let field = String::from_utf8_lossy(&self.output[start..end])
                    .trim()
                    .to_string();
                start = end;
                field
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunked(content: &str, size: usize) -> ByteStream {
        let chunks: Vec<Result<Bytes>> = content
            .as_bytes()
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        stream::iter(chunks).boxed()
    }

    async fn collect(mut rows: CsvRowStream) -> Result<Vec<RawRow>> {
        let mut out = Vec::new();
        while let Some(row) = rows.next_row().await? {
            out.push(row);
        }
        Ok(out)
    }

    const SAMPLE: &str = "Sample date,Ramp/site,Catch area,Chinook\n\
\"Jan 5, 2024\", Sunset Point ,Area 10,4\n\
\n\
\"Jan 6, 2024\",\"Quoted, Ramp\",Area 10,\n";

    #[tokio::test]
    async fn reads_header_keyed_rows() -> Result<()> {
        let rows = collect(CsvRowStream::new(chunked(SAMPLE, 1024))).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Sample date"), Some("Jan 5, 2024"));
        assert_eq!(rows[0].get("Ramp/site"), Some("Sunset Point"));
        assert_eq!(rows[0].get("Chinook"), Some("4"));
        assert_eq!(rows[1].get("Ramp/site"), Some("Quoted, Ramp"));
        assert_eq!(rows[1].get("Chinook"), Some(""));
        assert_eq!(rows[1].get("Coho"), None);
        Ok(())
    }

    #[tokio::test]
    async fn chunking_does_not_change_rows() -> Result<()> {
        let whole = collect(CsvRowStream::new(chunked(SAMPLE, 4096))).await?;
        for size in [1, 2, 3, 7, 16] {
            let rows = collect(CsvRowStream::new(chunked(SAMPLE, size))).await?;
            assert_eq!(rows.len(), whole.len(), "chunk size {}", size);
            for (a, b) in rows.iter().zip(&whole) {
                assert_eq!(a.values, b.values, "chunk size {}", size);
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn handles_bom_crlf_and_embedded_newlines() -> Result<()> {
        let content = "\u{feff}Sample date,Notes\r\n\"Jan 5, 2024\",\"two\nlines\"\r\n   ,  \r\n";
        let rows = collect(CsvRowStream::new(chunked(content, 5))).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Sample date"), Some("Jan 5, 2024"));
        assert_eq!(rows[0].get("Notes"), Some("two\nlines"));
        Ok(())
    }

    #[tokio::test]
    async fn large_records_grow_buffers() -> Result<()> {
        let wide: Vec<String> = (0..100).map(|i| format!("c{}", i)).collect();
        let long = "x".repeat(10_000);
        let content = format!("{}\n{},{}\n", wide.join(","), long, wide[1..].join(","));
        let rows = collect(CsvRowStream::new(chunked(&content, 333))).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("c0"), Some(long.as_str()));
        assert_eq!(rows[0].get("c99"), Some("c99"));
        Ok(())
    }

    #[tokio::test]
    async fn empty_document_has_no_rows() -> Result<()> {
        let mut rows = CsvRowStream::new(chunked("", 8));
        assert!(rows.headers().await?.is_none());
        assert!(rows.next_row().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn stream_errors_propagate() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"a,b\n1,")),
            Err(anyhow::anyhow!("connection reset")),
        ];
        let mut rows = CsvRowStream::new(stream::iter(chunks).boxed());
        let err = rows.next_row().await.unwrap_err();
        assert!(format!("{:#}", err).contains("connection reset"));
    }
}

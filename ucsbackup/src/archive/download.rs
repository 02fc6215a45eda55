//! Chunked archive download over range GETs.
//!
//! The file-transfer endpoint answers one bounded byte window per request,
//! driven by a request-side `Content-Range: {start}-{end}/{size}` header.
//! The total size is unknown until the first response arrives; by API
//! convention that first response is metadata-only and its bytes are not
//! written. The endpoint also rejects a request whose window exceeds the
//! file, so for files smaller than one chunk the window is narrowed to the
//! discovered total before the first real fetch.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::debug;

use super::error::{ArchiveError, ArchiveResult};
use super::naming::ArchiveName;
use crate::client::{ByteRange, RestClient};
use crate::config::DeviceConfig;

/// REST endpoint serving archive files for download.
pub const DOWNLOAD_ENDPOINT: &str = "/mgmt/shared/file-transfer/ucs-downloads";

/// Progress callback: (bytes written so far, total bytes).
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Successful download result.
#[derive(Debug)]
pub struct DownloadReport {
    pub archive: ArchiveName,
    pub bytes_written: u64,
    pub elapsed: Duration,
    pub local_path: PathBuf,
}

/// Byte-range cursor for one transfer.
///
/// `size` holds the last valid byte index once learned from the first
/// response, with `0` as the not-yet-known sentinel. It never changes again
/// within the session.
#[derive(Debug)]
struct DownloadSession {
    start: u64,
    end: u64,
    size: u64,
    chunk: u64,
    written: u64,
}

impl DownloadSession {
    fn new(chunk_size: u64) -> Self {
        Self {
            start: 0,
            end: chunk_size.saturating_sub(1),
            size: 0,
            chunk: chunk_size,
            written: 0,
        }
    }

    fn range(&self) -> ByteRange {
        ByteRange {
            start: self.start,
            end: self.end,
            size: self.size,
        }
    }

    fn size_known(&self) -> bool {
        self.size > 0
    }

    /// Record the discovered file size and narrow the window if the whole
    /// file fits in less than one chunk.
    fn record_total(&mut self, total: u64) {
        self.size = total.saturating_sub(1);
        if self.chunk > self.size {
            self.end = self.size;
        }
    }

    /// Advance the window past the bytes just received. Returns `false`
    /// once the final window has been consumed.
    fn advance(&mut self) -> bool {
        if self.end == self.size {
            return false;
        }
        self.start += self.chunk;
        self.end = (self.start + self.chunk - 1).min(self.size);
        true
    }
}

/// Download a remote archive into the configured local directory.
///
/// The local file is named identically to the remote archive. On transport
/// failure the partial file is left in place; callers decide whether to
/// discard it.
///
/// # Errors
///
/// `Transport` on any failed range request, `UnexpectedResponse` when the
/// first response lacks a parsable `Content-Range` total, and
/// `WriteFailed` on local I/O problems.
pub async fn download_archive(
    client: &dyn RestClient,
    config: &DeviceConfig,
    archive: &ArchiveName,
    progress: Option<ProgressFn>,
) -> ArchiveResult<DownloadReport> {
    let local_path = config.archive_dir.join(archive.as_str());
    fs::create_dir_all(&config.archive_dir).map_err(|e| ArchiveError::WriteFailed {
        path: config.archive_dir.clone(),
        source: e,
    })?;
    let file = File::create(&local_path).map_err(|e| ArchiveError::WriteFailed {
        path: local_path.clone(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let endpoint = format!("{}/{}", DOWNLOAD_ENDPOINT, archive.as_str());
    let mut session = DownloadSession::new(config.chunk_size);
    let started = Instant::now();

    loop {
        let chunk = client.get_range(&endpoint, session.range()).await?;

        if !session.size_known() {
            // First response: learn the total, keep the cursor where it is,
            // and discard the body.
            let total = parse_total(chunk.content_range.as_deref())?;
            session.record_total(total);
            debug!(total, chunk = session.chunk, "discovered archive size");
            continue;
        }

        writer
            .write_all(&chunk.body)
            .map_err(|e| ArchiveError::WriteFailed {
                path: local_path.clone(),
                source: e,
            })?;
        session.written += chunk.body.len() as u64;

        if let Some(ref cb) = progress {
            cb(session.written, session.size + 1);
        }

        if !session.advance() {
            break;
        }
    }

    writer.flush().map_err(|e| ArchiveError::WriteFailed {
        path: local_path.clone(),
        source: e,
    })?;

    Ok(DownloadReport {
        archive: archive.clone(),
        bytes_written: session.written,
        elapsed: started.elapsed(),
        local_path,
    })
}

/// Extract the total size from a response `Content-Range` header
/// (`bytes {start}-{end}/{total}`).
fn parse_total(content_range: Option<&str>) -> ArchiveResult<u64> {
    let header = content_range.ok_or(ArchiveError::MissingField {
        context: "size discovery",
        field: "Content-Range",
    })?;
    header
        .rsplit('/')
        .next()
        .and_then(|t| t.trim().parse().ok())
        .ok_or_else(|| ArchiveError::UnexpectedResponse {
            context: "size discovery",
            detail: format!("unparsable Content-Range {:?}", header),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientFuture, RangeChunk, RestResponse, TransportError};
    use serde_json::Value;
    use std::sync::Mutex;

    /// Serves a byte buffer the way the file-transfer endpoint does:
    /// whatever window is asked for, clamped to the file, with the real
    /// total in the response header.
    struct FakeRangeServer {
        data: Vec<u8>,
        requests: Mutex<u64>,
        fail_after: Option<u64>,
    }

    impl FakeRangeServer {
        fn new(data: Vec<u8>) -> Self {
            Self {
                data,
                requests: Mutex::new(0),
                fail_after: None,
            }
        }

        fn failing_after(data: Vec<u8>, n: u64) -> Self {
            Self {
                data,
                requests: Mutex::new(0),
                fail_after: Some(n),
            }
        }

        fn request_count(&self) -> u64 {
            *self.requests.lock().unwrap()
        }
    }

    impl RestClient for FakeRangeServer {
        fn get_json<'a>(&'a self, _: &'a str, _: Option<&'a str>) -> ClientFuture<'a, Value> {
            unimplemented!("download only")
        }
        fn post_json<'a>(&'a self, _: &'a str, _: &'a Value) -> ClientFuture<'a, Value> {
            unimplemented!("download only")
        }
        fn put_json<'a>(&'a self, _: &'a str, _: &'a Value) -> ClientFuture<'a, Value> {
            unimplemented!("download only")
        }
        fn delete<'a>(&'a self, _: &'a str) -> ClientFuture<'a, RestResponse> {
            unimplemented!("download only")
        }

        fn get_range<'a>(&'a self, path: &'a str, range: ByteRange) -> ClientFuture<'a, RangeChunk> {
            Box::pin(async move {
                let mut count = self.requests.lock().unwrap();
                *count += 1;
                if let Some(limit) = self.fail_after {
                    if *count > limit {
                        return Err(TransportError::Request {
                            url: path.to_string(),
                            reason: "connection reset".to_string(),
                        });
                    }
                }

                let total = self.data.len() as u64;
                let end = range.end.min(total - 1);
                let body = self.data[range.start as usize..=end as usize].to_vec();
                Ok(RangeChunk {
                    content_range: Some(format!("{}-{}/{}", range.start, end, total)),
                    body,
                })
            })
        }
    }

    fn test_config(dir: &std::path::Path, chunk: u64) -> DeviceConfig {
        DeviceConfig::new("10.9.8.7", "admin", "secret")
            .with_archive_dir(dir)
            .with_chunk_size(chunk)
    }

    fn test_data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_download_multi_chunk() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = test_data(1300);
        let server = FakeRangeServer::new(data.clone());
        let archive = ArchiveName::from_existing("lb1_2026-08-08_142.ucs");

        let report = download_archive(&server, &test_config(dir.path(), 512), &archive, None)
            .await
            .unwrap();

        assert_eq!(report.bytes_written, 1300);
        // ceil(1300 / 512) fetches plus the size-discovery request.
        assert_eq!(server.request_count(), 4);

        let written = fs::read(&report.local_path).unwrap();
        assert_eq!(written, data);
    }

    #[tokio::test]
    async fn test_download_smaller_than_chunk() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = test_data(100);
        let server = FakeRangeServer::new(data.clone());
        let archive = ArchiveName::from_existing("lb1_2026-08-08_101.ucs");

        let report = download_archive(&server, &test_config(dir.path(), 512), &archive, None)
            .await
            .unwrap();

        assert_eq!(report.bytes_written, 100);
        assert_eq!(server.request_count(), 2);
        assert_eq!(fs::read(&report.local_path).unwrap(), data);
    }

    #[tokio::test]
    async fn test_download_exact_chunk_multiple() {
        let dir = tempfile::TempDir::new().unwrap();
        let data = test_data(1024);
        let server = FakeRangeServer::new(data.clone());
        let archive = ArchiveName::from_existing("lb1_2026-08-08_233.ucs");

        let report = download_archive(&server, &test_config(dir.path(), 512), &archive, None)
            .await
            .unwrap();

        assert_eq!(report.bytes_written, 1024);
        assert_eq!(fs::read(&report.local_path).unwrap(), data);
    }

    #[tokio::test]
    async fn test_download_failure_leaves_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        // Fail after the metadata request and one data chunk.
        let server = FakeRangeServer::failing_after(test_data(1300), 2);
        let archive = ArchiveName::from_existing("lb1_2026-08-08_177.ucs");

        let err = download_archive(&server, &test_config(dir.path(), 512), &archive, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ArchiveError::Transport(_)));
        let partial = dir.path().join(archive.as_str());
        assert!(partial.exists());
    }

    #[tokio::test]
    async fn test_download_reports_progress() {
        let dir = tempfile::TempDir::new().unwrap();
        let server = FakeRangeServer::new(test_data(1300));
        let archive = ArchiveName::from_existing("lb1_2026-08-08_299.ucs");

        let seen: std::sync::Arc<Mutex<Vec<(u64, u64)>>> =
            std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let progress: ProgressFn = Box::new(move |written, total| {
            sink.lock().unwrap().push((written, total));
        });

        download_archive(
            &server,
            &test_config(dir.path(), 512),
            &archive,
            Some(progress),
        )
        .await
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last(), Some(&(1300, 1300)));
    }

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total(Some("0-511/1300")).unwrap(), 1300);
        assert_eq!(parse_total(Some("bytes 0-511/1300")).unwrap(), 1300);
        assert!(parse_total(Some("garbage")).is_err());
        assert!(parse_total(None).is_err());
    }

    #[test]
    fn test_session_narrows_for_small_file() {
        let mut session = DownloadSession::new(512);
        assert_eq!(session.range().to_string(), "0-511/0");

        session.record_total(100);
        assert_eq!(session.range().to_string(), "0-99/99");
        assert!(!session.advance());
    }
}

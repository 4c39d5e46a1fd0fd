use std::path::{Path, PathBuf};

use reqwest::Response;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use url::Url;

use crate::parse::DocumentRef;
use crate::request::Session;
use crate::{Error, Result};

/// What happened to one document.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub reference: DocumentRef,
    pub destination: PathBuf,
    pub bytes_written: u64,
    pub error: Option<Error>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Streams documents from the session to disk.
#[derive(Debug, Clone)]
pub struct Downloader {
    session: Session,
}

impl Downloader {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Downloads `reference` to `destination`, capturing any failure in the outcome.
    pub async fn download(&self, reference: DocumentRef, destination: PathBuf) -> DownloadOutcome {
        match self.fetch_to_file(&reference.url, &destination).await {
            Ok(bytes_written) => DownloadOutcome {
                reference,
                destination,
                bytes_written,
                error: None,
            },
            Err(error) => DownloadOutcome {
                reference,
                destination,
                bytes_written: 0,
                error: Some(error),
            },
        }
    }

    /// Fetches `url` and writes the body to `destination`, replacing whatever was there.
    /// Returns the number of bytes written.
    pub async fn fetch_to_file(&self, url: &Url, destination: &Path) -> Result<u64> {
        let response = self.session.fetch_success(url).await?;

        if tokio::fs::try_exists(destination).await.unwrap_or(false) {
            warn!(path = %destination.display(), "overwriting existing file");
        }
        let file = File::create(destination)
            .await
            .map_err(|e| Error::storage(destination, e))?;

        let result = stream_to_file(file, response, url, destination).await;
        if result.is_err() {
            debug!(path = %destination.display(), "removing partial file");
            let _ = tokio::fs::remove_file(destination).await;
        }
        result
    }
}

/// Writes the response body chunk by chunk; the body is never held in memory whole.
async fn stream_to_file(
    file: File,
    mut response: Response,
    url: &Url,
    path: &Path,
) -> Result<u64> {
    let mut writer = BufWriter::new(file);
    let mut bytes_written = 0u64;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| Error::transport(url.as_str(), e))?
    {
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| Error::storage(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| Error::storage(path, e))?;
    Ok(bytes_written)
}

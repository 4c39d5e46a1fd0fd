use std::path::Path;

use tracing::{error, info, warn};
use url::Url;

use crate::download::DownloadOutcome;
use crate::parse::DocumentRef;
use crate::Error;

/// Receives progress and failures of a harvest run as they happen.
///
/// The run itself returns nothing beyond this stream of events.
pub trait Reporter: Send + Sync {
    fn page_started(&self, page: u32, url: &Url);

    /// Fetching or parsing `page` failed; the run moves on to the next page.
    fn page_failed(&self, page: u32, url: &Url, error: &Error);

    fn page_extracted(&self, _page: u32, _found: usize) {}

    fn download_started(&self, page: u32, reference: &DocumentRef, destination: &Path);

    fn download_finished(&self, page: u32, outcome: &DownloadOutcome);
}

/// Writes every event as a human-readable `tracing` line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn page_started(&self, page: u32, url: &Url) {
        info!(page, %url, "Processing page");
    }

    fn page_failed(&self, page: u32, url: &Url, error: &Error) {
        error!(page, %url, %error, "Failed to find PDF links");
    }

    fn page_extracted(&self, page: u32, found: usize) {
        info!(page, found, "Found documents");
    }

    fn download_started(&self, page: u32, reference: &DocumentRef, destination: &Path) {
        info!(
            page,
            url = %reference.url,
            title = reference.title.as_deref().unwrap_or("-"),
            path = %destination.display(),
            "Downloading PDF"
        );
    }

    fn download_finished(&self, page: u32, outcome: &DownloadOutcome) {
        match &outcome.error {
            None => info!(
                page,
                path = %outcome.destination.display(),
                bytes = outcome.bytes_written,
                "Successfully downloaded"
            ),
            Some(error) => warn!(
                page,
                url = %outcome.reference.url,
                title = outcome.reference.title.as_deref().unwrap_or("-"),
                %error,
                "Failed to download PDF"
            ),
        }
    }
}

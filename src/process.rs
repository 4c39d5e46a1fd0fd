use std::future::Future;
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::task::JoinSet;
use tracing::error;
use url::Url;

use crate::download::{DownloadOutcome, Downloader};
use crate::naming::{derive_name, NamingPolicy};
use crate::parse::{DocumentRef, Extractor, ListingLayout};
use crate::report::Reporter;
use crate::request::{ListingSource, Session};
use crate::{info_time, Error, Result};

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Must already exist and be writable.
    pub output_dir: PathBuf,
    pub naming: NamingPolicy,
    /// Downloads in flight at once within a page. 1 keeps the run fully sequential.
    pub concurrency: NonZeroUsize,
}

impl HarvestConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            naming: NamingPolicy::default(),
            concurrency: NonZeroUsize::MIN,
        }
    }
}

/// Drives a page range through fetch, extraction and download.
///
/// A page that can't be fetched or parsed is reported and skipped; a document that
/// can't be downloaded is reported and skipped. Only an unusable output directory or
/// an invalid range stops a run.
pub struct Harvester {
    config: HarvestConfig,
    source: ListingSource,
    session: Session,
    extractor: Extractor,
    downloader: Downloader,
}

impl Harvester {
    pub fn new(
        config: HarvestConfig,
        source: ListingSource,
        session: Session,
        layout: Arc<dyn ListingLayout>,
    ) -> Self {
        let extractor = Extractor::for_policy(config.naming, layout, source.origin().clone());
        let downloader = Downloader::new(session.clone());
        Self {
            config,
            source,
            session,
            extractor,
            downloader,
        }
    }

    pub async fn run(&self, pages: RangeInclusive<u32>, reporter: &dyn Reporter) -> Result<()> {
        let start_time = Local::now();
        let (start, end) = (*pages.start(), *pages.end());
        if start == 0 || pages.is_empty() {
            return Err(Error::InvalidPageRange { start, end });
        }
        self.check_output_dir().await?;

        info_time!("Started harvesting pages {start}..={end}");
        for page in pages {
            let page_time = Local::now();
            self.process_page(page, reporter).await;
            info_time!(page_time, "Processed page {}", page);
        }
        info_time!(start_time, "Finished harvesting pages {start}..={end}");

        Ok(())
    }

    /// Fetches, extracts and downloads one page. Every failure is reported, none escapes.
    async fn process_page(&self, page: u32, reporter: &dyn Reporter) {
        let url = self.source.page_url(page);
        reporter.page_started(page, &url);

        let references = match self.fetch_references(&url).await {
            Ok(references) => references,
            Err(err) => {
                reporter.page_failed(page, &url, &err);
                return;
            }
        };
        reporter.page_extracted(page, references.len());

        let limit = self.config.concurrency.get();
        let mut in_flight = JoinSet::new();
        for (idx, reference) in references.into_iter().enumerate() {
            let name = derive_name(&reference, page, idx + 1, self.config.naming);
            let destination = self.config.output_dir.join(name);

            while in_flight.len() >= limit {
                match in_flight.join_next().await {
                    Some(done) => report_download(page, done, reporter),
                    None => break,
                }
            }
            reporter.download_started(page, &reference, &destination);
            let downloader = self.downloader.clone();
            in_flight.spawn(contain_panic(
                reference.clone(),
                destination.clone(),
                async move { downloader.download(reference, destination).await },
            ));
        }

        while let Some(done) = in_flight.join_next().await {
            report_download(page, done, reporter);
        }
    }

    async fn fetch_references(&self, url: &Url) -> Result<Vec<DocumentRef>> {
        let body = self.session.fetch_listing(url).await?;
        self.extractor.extract(url, body).await
    }

    /// An output directory that can't take files aborts the run before any page is fetched.
    async fn check_output_dir(&self) -> Result<()> {
        let path = &self.config.output_dir;
        let unusable = |reason: String| Error::OutputDir {
            path: path.clone(),
            reason,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| unusable(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(unusable("not a directory".into()));
        }
        if metadata.permissions().readonly() {
            return Err(unusable("directory is read-only".into()));
        }
        Ok(())
    }
}

/// Runs a download on its own task so a panic becomes a failed outcome for that document.
async fn contain_panic<F>(
    reference: DocumentRef,
    destination: PathBuf,
    download: F,
) -> DownloadOutcome
where
    F: Future<Output = DownloadOutcome> + Send + 'static,
{
    match tokio::spawn(download).await {
        Ok(outcome) => outcome,
        Err(err) => DownloadOutcome {
            reference,
            destination,
            bytes_written: 0,
            error: Some(Error::RuntimeJoin(err)),
        },
    }
}

fn report_download(
    page: u32,
    done: core::result::Result<DownloadOutcome, tokio::task::JoinError>,
    reporter: &dyn Reporter,
) {
    match done {
        Ok(outcome) => reporter.download_finished(page, &outcome),
        // Only reachable if the page task itself is torn down mid-download.
        Err(err) => error!(page, %err, "download task did not complete"),
    }
}

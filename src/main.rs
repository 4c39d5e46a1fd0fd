use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use url::Url;

use paper_harvest::{
    info_time, HarvestConfig, Harvester, ListingSource, NamingPolicy, SelectorLayout, Session,
    SessionConfig, TracingReporter, DEFAULT_TIMEOUT_SECS, MAX_REDIRECTS, SITE_ORIGIN,
};

/// Last page harvested when `--end-page` isn't given and the start page is before it.
const DEFAULT_END_PAGE: u32 = 10;

#[derive(Parser)]
#[command(name = "paper-harvest", version, about = "Download the PDFs listed on a paginated search listing")]
struct Cli {
    /// Directory to save downloaded PDFs (created if missing)
    #[arg(short, long, env = "HARVEST_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// The starting page number
    #[arg(long, alias = "startPage", env = "HARVEST_START_PAGE", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    start_page: u32,

    /// The ending page number [default: 10, or the start page when that is past 10]
    #[arg(long, alias = "endPage", env = "HARVEST_END_PAGE",
          value_parser = clap::value_parser!(u32).range(1..))]
    end_page: Option<u32>,

    /// How downloaded files are named
    #[arg(long, env = "HARVEST_NAMING", value_enum, default_value_t = Naming::Title)]
    naming: Naming,

    /// Downloads in flight at once within a page
    #[arg(long, env = "HARVEST_CONCURRENCY", default_value = "1")]
    concurrency: NonZeroUsize,

    /// Per-request deadline in seconds, 0 disables it
    #[arg(long, env = "HARVEST_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Site origin the listing is fetched from
    #[arg(long, env = "HARVEST_ORIGIN", default_value = SITE_ORIGIN)]
    origin: Url,
}

#[derive(Clone, Copy, ValueEnum)]
enum Naming {
    /// Name files after the document title
    Title,
    /// Name files page-<page>-document-<n>
    Positional,
}

impl Cli {
    fn pages(&self) -> Result<RangeInclusive<u32>> {
        let end_page = self
            .end_page
            .unwrap_or_else(|| self.start_page.max(DEFAULT_END_PAGE));
        if end_page < self.start_page {
            anyhow::bail!(
                "end page {} is before start page {}",
                end_page,
                self.start_page
            );
        }
        Ok(self.start_page..=end_page)
    }
}

impl From<Naming> for NamingPolicy {
    fn from(value: Naming) -> Self {
        match value {
            Naming::Title => NamingPolicy::FromTitle,
            Naming::Positional => NamingPolicy::Positional,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let start_time = Local::now();

    let pages = cli.pages()?;

    tokio::fs::create_dir_all(&cli.output)
        .await
        .with_context(|| format!("Failed to create output directory {}", cli.output.display()))?;

    let session = Session::new(&SessionConfig {
        max_redirects: MAX_REDIRECTS,
        timeout: (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs)),
        ..SessionConfig::default()
    })?;
    let layout = Arc::new(SelectorLayout::springer()?);
    let config = HarvestConfig {
        output_dir: cli.output,
        naming: cli.naming.into(),
        concurrency: cli.concurrency,
    };

    let harvester = Harvester::new(config, ListingSource::with_origin(cli.origin), session, layout);
    harvester.run(pages, &TracingReporter).await?;

    info_time!(start_time, "Full program time:");
    Ok(())
}

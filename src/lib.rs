//! Harvests PDF documents from a paginated, server-rendered search listing.
//!
//! Every page in a range is fetched, the document links on it are extracted,
//! each document gets a filesystem-safe name and is streamed to disk.
//! Failures are contained to the page or document they happened on.

mod cookies;
mod download;
mod error;
mod macros;
mod naming;
mod parse;
pub mod process;
mod report;
mod request;

pub use cookies::PublicSuffixJar;
pub use download::{DownloadOutcome, Downloader};
pub use error::{Error, ErrorKind, Result};
pub use naming::{derive_name, sanitize_name, NamingPolicy};
pub use parse::{DocumentRef, Extractor, ListingLayout, Role, SelectorLayout};
pub use process::{HarvestConfig, Harvester};
pub use report::{Reporter, TracingReporter};
pub use request::{ListingSource, Session, SessionConfig};

/// Origin every listing page and relative document link is resolved against.
pub const SITE_ORIGIN: &str = "https://link.springer.com";
/// Fixed query shared by all listing pages: open-access articles of one journal.
pub const LISTING_QUERY: &str =
    "query=&search-within=Journal&package=openaccessarticles&facet-journal-id=146";
/// A download link only qualifies when its path contains this suffix.
pub const DOCUMENT_SUFFIX: &str = ".pdf";
/// Redirect hops followed per request before the last response is returned as-is.
pub const MAX_REDIRECTS: usize = 10;
/// Default whole-request deadline in seconds, used by the CLI.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// Listing item selectors.
const ITEM_SELECTOR: &str = "li";
const TITLE_SELECTOR: &str = "a.title";
const LINK_SELECTOR: &str = "a.pdf-link";
/// Upper bound in bytes for a whole file name, suffix included. Filesystems cap names at 255 bytes.
const MAX_NAME_BYTES: usize = 240;

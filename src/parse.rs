use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tokio::task::spawn_blocking;
use tracing::debug;
use url::Url;

use crate::naming::NamingPolicy;
use crate::{Error, Result, DOCUMENT_SUFFIX, ITEM_SELECTOR, LINK_SELECTOR, TITLE_SELECTOR};

/// A document found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Trimmed title text. Always `None` for index-only extraction.
    pub title: Option<String>,
    /// Absolute download URL.
    pub url: Url,
}

/// The part an element plays inside a listing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Title,
    DownloadLink,
}

/// How a listing page is laid out: where the items are and what is inside them.
pub trait ListingLayout: Send + Sync {
    /// All candidate item nodes, in document order.
    fn items<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>>;

    /// First descendant of `item` playing `role`.
    fn find<'a>(&self, item: ElementRef<'a>, role: Role) -> Option<ElementRef<'a>>;
}

/// [`ListingLayout`] driven by CSS selectors.
#[derive(Debug, Clone)]
pub struct SelectorLayout {
    item: Selector,
    title: Selector,
    link: Selector,
}

impl SelectorLayout {
    pub fn new(item: &str, title: &str, link: &str) -> Result<Self> {
        Ok(Self {
            item: create_selector(item)?,
            title: create_selector(title)?,
            link: create_selector(link)?,
        })
    }

    /// `li` items with an `a.title` title and an `a.pdf-link` download link.
    pub fn springer() -> Result<Self> {
        Self::new(ITEM_SELECTOR, TITLE_SELECTOR, LINK_SELECTOR)
    }
}

impl ListingLayout for SelectorLayout {
    fn items<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        doc.select(&self.item).collect()
    }

    fn find<'a>(&self, item: ElementRef<'a>, role: Role) -> Option<ElementRef<'a>> {
        let selector = match role {
            Role::Title => &self.title,
            Role::DownloadLink => &self.link,
        };
        item.select(selector).next()
    }
}

/// Turns listing page bodies into [`DocumentRef`]s.
///
/// Hrefs are resolved against `origin`. Items without a download link, or whose link
/// doesn't point at a document, are skipped.
#[derive(Clone)]
pub struct Extractor {
    layout: Arc<dyn ListingLayout>,
    origin: Url,
    capture_titles: bool,
}

impl Extractor {
    pub fn title_aware(layout: Arc<dyn ListingLayout>, origin: Url) -> Self {
        Self {
            layout,
            origin,
            capture_titles: true,
        }
    }

    pub fn index_only(layout: Arc<dyn ListingLayout>, origin: Url) -> Self {
        Self {
            layout,
            origin,
            capture_titles: false,
        }
    }

    /// Titles are only worth capturing when files are named after them.
    pub fn for_policy(policy: NamingPolicy, layout: Arc<dyn ListingLayout>, origin: Url) -> Self {
        match policy {
            NamingPolicy::FromTitle => Self::title_aware(layout, origin),
            NamingPolicy::Positional => Self::index_only(layout, origin),
        }
    }

    /// Parses a fetched page body on the blocking pool.
    /// `source` names the page in error messages.
    pub async fn extract(&self, source: &Url, body: Vec<u8>) -> Result<Vec<DocumentRef>> {
        let html = String::from_utf8(body).map_err(|e| Error::Parse {
            url: source.to_string(),
            reason: format!("body is not valid UTF-8: {e}"),
        })?;

        let references = spawn_blocking({
            let extractor = self.clone();
            move || extractor.parse_html(&html)
        })
        .await?;

        Ok(references)
    }

    /// Extracts every qualifying item from `html`, in document order.
    pub fn parse_html(&self, html: &str) -> Vec<DocumentRef> {
        let doc = Html::parse_document(html);

        let items = self.layout.items(&doc);
        let total = items.len();
        let references = items
            .into_iter()
            .filter_map(|item| self.parse_item(item))
            .collect::<Vec<_>>();

        debug!(
            found = references.len(),
            skipped = total - references.len(),
            "parsed listing"
        );
        references
    }

    fn parse_item(&self, item: ElementRef<'_>) -> Option<DocumentRef> {
        let href = self
            .layout
            .find(item, Role::DownloadLink)?
            .value()
            .attr("href")?;
        let url = self.origin.join(href.trim()).ok()?;
        if !url.path().contains(DOCUMENT_SUFFIX) {
            return None;
        }

        let title = if self.capture_titles {
            self.layout.find(item, Role::Title).map(element_text)
        } else {
            None
        };

        Some(DocumentRef { title, url })
    }
}

/// Text content with whitespace runs collapsed and the ends trimmed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseMissingSelector(sel_str.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <nav><ul><li><a href="/search/page/2">Next</a></li></ul></nav>
        <ol class="content-item-list">
          <li>
            <h2><a class="title" href="/article/10.1007/a">
              Deep   Learning
              for Cells</a></h2>
            <a class="pdf-link" href="/content/pdf/10.1007/a.pdf">Download PDF</a>
          </li>
          <li>
            <h2><a class="title" href="/article/10.1007/b">Only an abstract</a></h2>
            <a class="webtrekk-track" href="/article/10.1007/b">View</a>
          </li>
          <li>
            <h2><a class="title" href="/article/10.1007/c">Second: Paper?</a></h2>
            <a class="pdf-link" href="/content/pdf/10.1007/c.pdf">Download PDF</a>
          </li>
          <li>
            <h2><a class="title" href="/article/10.1007/d">Not a document</a></h2>
            <a class="pdf-link" href="/content/epub/10.1007/d.epub">Download EPUB</a>
          </li>
          <li>
            <a class="pdf-link" href="/content/pdf/10.1007/e.pdf">Download PDF</a>
          </li>
        </ol>
        </body></html>
    "#;

    fn origin() -> Url {
        Url::parse("https://link.springer.com").unwrap()
    }

    fn layout() -> Arc<dyn ListingLayout> {
        Arc::new(SelectorLayout::springer().unwrap())
    }

    #[test]
    fn extracts_only_qualifying_items_in_document_order() {
        let refs = Extractor::title_aware(layout(), origin()).parse_html(LISTING);

        let urls = refs.iter().map(|r| r.url.as_str()).collect::<Vec<_>>();
        assert_eq!(
            urls,
            [
                "https://link.springer.com/content/pdf/10.1007/a.pdf",
                "https://link.springer.com/content/pdf/10.1007/c.pdf",
                "https://link.springer.com/content/pdf/10.1007/e.pdf",
            ]
        );
    }

    #[test]
    fn title_aware_captures_trimmed_titles() {
        let refs = Extractor::title_aware(layout(), origin()).parse_html(LISTING);

        let titles = refs.iter().map(|r| r.title.as_deref()).collect::<Vec<_>>();
        assert_eq!(
            titles,
            [Some("Deep Learning for Cells"), Some("Second: Paper?"), None]
        );
    }

    #[test]
    fn index_only_skips_titles() {
        let refs = Extractor::index_only(layout(), origin()).parse_html(LISTING);

        assert_eq!(refs.len(), 3);
        assert!(refs.iter().all(|r| r.title.is_none()));
    }

    #[test]
    fn page_without_items_yields_nothing() {
        let refs = Extractor::title_aware(layout(), origin())
            .parse_html("<html><body><p>No results</p></body></html>");
        assert!(refs.is_empty());
    }

    #[test]
    fn absolute_hrefs_are_kept() {
        let html = r#"<ul><li><a class="pdf-link" href="https://static.springer.com/x/y.pdf">PDF</a></li></ul>"#;
        let refs = Extractor::index_only(layout(), origin()).parse_html(html);
        assert_eq!(refs[0].url.as_str(), "https://static.springer.com/x/y.pdf");
    }

    #[test]
    fn invalid_selector_is_rejected() {
        let err = SelectorLayout::new("li", "a[", "a.pdf-link").unwrap_err();
        assert!(matches!(err, Error::ParseMissingSelector(ref s) if s == "a["));
    }

    #[tokio::test]
    async fn non_utf8_body_is_a_parse_error() {
        let extractor = Extractor::title_aware(layout(), origin());
        let err = extractor
            .extract(&origin(), vec![0x3c, 0x6c, 0x69, 0xff, 0xfe])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Parse);
    }

    #[tokio::test]
    async fn extract_runs_off_the_async_thread() {
        let extractor = Extractor::for_policy(NamingPolicy::FromTitle, layout(), origin());
        let refs = extractor
            .extract(&origin(), LISTING.as_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(refs.len(), 3);
    }
}

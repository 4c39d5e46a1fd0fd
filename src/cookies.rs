use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use tracing::debug;
use url::Url;

/// Cookie store that refuses cookies scoped to a public suffix.
///
/// Host-only cookies and cookies whose `Domain` attribute is a registrable domain
/// are handed to the inner [`Jar`], which does the usual domain matching: subdomains
/// of one registrable domain share cookies, unrelated domains never see each other's.
/// A `Domain=co.uk` style cookie would leak across every site under that suffix,
/// so it is dropped before it reaches the jar.
#[derive(Debug, Default)]
pub struct PublicSuffixJar {
    inner: Jar,
}

impl PublicSuffixJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for PublicSuffixJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let mut accepted = cookie_headers
            .filter(|header| {
                let Some(domain) = header.to_str().ok().and_then(domain_attribute) else {
                    return true;
                };
                let registrable = psl::domain_str(&domain).is_some();
                if !registrable {
                    debug!(%url, %domain, "rejecting cookie scoped to a public suffix");
                }
                registrable
            })
            .collect::<Vec<_>>()
            .into_iter();
        self.inner.set_cookies(&mut accepted, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.inner.cookies(url)
    }
}

/// Returns the lowercased `Domain` attribute of a `Set-Cookie` value, without a leading dot.
fn domain_attribute(set_cookie: &str) -> Option<String> {
    set_cookie.split(';').skip(1).find_map(|attr| {
        let (name, value) = attr.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("domain") {
            return None;
        }
        let value = value.trim().trim_start_matches('.');
        (!value.is_empty()).then(|| value.to_ascii_lowercase())
    })
}

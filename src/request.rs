use std::sync::Arc;
use std::time::Duration;

use reqwest::{redirect, Client, Response};
use tracing::debug;
use url::Url;

use crate::cookies::PublicSuffixJar;
use crate::{Error, Result, LISTING_QUERY, MAX_REDIRECTS, SITE_ORIGIN};

/// Where the listing lives: a site origin plus the fixed query every page carries.
#[derive(Debug, Clone)]
pub struct ListingSource {
    origin: Url,
    query: String,
}

impl Default for ListingSource {
    fn default() -> Self {
        Self {
            origin: Url::parse(SITE_ORIGIN).expect("SITE_ORIGIN is a valid URL"),
            query: LISTING_QUERY.to_string(),
        }
    }
}

impl ListingSource {
    pub fn new(origin: Url, query: impl Into<String>) -> Self {
        Self {
            origin,
            query: query.into(),
        }
    }

    /// Same source with a different origin, e.g. a mirror or a local test server.
    pub fn with_origin(origin: Url) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Page 1 is the canonical listing URL, later pages get a `/page/<n>` segment.
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.origin.clone();
        if page <= 1 {
            url.set_path("search");
        } else {
            url.set_path(&format!("search/page/{page}"));
        }
        url.set_query(Some(&self.query));
        url
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_redirects: usize,
    /// Whole-request deadline. `None` leaves only the platform's connect behaviour.
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_redirects: MAX_REDIRECTS,
            timeout: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// HTTP session shared by every fetch of a run.
///
/// Cookies persist across requests in a [`PublicSuffixJar`]. Redirects are followed up to
/// `max_redirects` hops per request, after which the last redirect response is returned
/// unfollowed instead of failing.
/// Clones share the connection pool and the cookie jar.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    cookies: Arc<PublicSuffixJar>,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let cookies = Arc::new(PublicSuffixJar::new());
        let max_redirects = config.max_redirects;
        let policy = redirect::Policy::custom(move |attempt| {
            // `previous` holds every URL requested so far in this chain, so its length
            // is the number of the redirect hop being considered.
            if attempt.previous().len() > max_redirects {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let mut builder = Client::builder()
            .cookie_provider(cookies.clone())
            .redirect(policy)
            .user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::ClientBuild)?;

        Ok(Self { client, cookies })
    }

    pub fn cookies(&self) -> &PublicSuffixJar {
        &self.cookies
    }

    /// Sends a GET request and returns the final response, whatever its status.
    pub async fn fetch(&self, url: &Url) -> Result<Response> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;
        debug!(%url, status = %response.status(), final_url = %response.url(), "response");
        Ok(response)
    }

    /// Like [`Session::fetch`], but a non-2xx final status is an error.
    pub async fn fetch_success(&self, url: &Url) -> Result<Response> {
        let response = self.fetch(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// Requests a listing page and returns its raw body.
    pub async fn fetch_listing(&self, url: &Url) -> Result<Vec<u8>> {
        let body = self
            .fetch_success(url)
            .await?
            .bytes()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;
        Ok(body.to_vec())
    }
}

//! Current test statuses from the Xymon `appfeed.sh` CGI.
//!
//! [`FeedClient::query`] never fails: transport problems, unparsable XML and
//! empty results each turn into a single placeholder record keyed by the
//! queried host/test.

mod feed;
mod query;

pub use feed::{decode_feed, parse_feed, ParseError, StatusCollection, StatusRecord};
pub use query::FeedQuery;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use xymon_core::XymonConfig;

pub const UNKNOWN: &str = "unknown";
pub const UNMONITORED: &str = "unmonitored";
pub const PARSE_ERROR_SUMMARY: &str = "Error parsing XML from Xymon";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid appfeed URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("appfeed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// HTTP client for one Xymon web server.
#[derive(Debug, Clone)]
pub struct FeedClient {
    server: String,
    cgi_prefix: String,
    http: Client,
}

impl FeedClient {
    pub fn new(config: &XymonConfig) -> Result<Self, FeedError> {
        let http = Client::builder()
            .user_agent(format!("xymon-client/{}", xymon_core::version()))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(FeedError::Client)?;
        Ok(FeedClient {
            server: config.server.clone(),
            cgi_prefix: config.cgi_prefix.clone(),
            http,
        })
    }

    /// `{scheme}://{server}`; detail URLs in the feed are relative to it.
    pub fn base(&self, use_tls: bool) -> String {
        let scheme = if use_tls { "https" } else { "http" };
        format!("{}://{}", scheme, self.server)
    }

    /// The appfeed script location, without the query string.
    pub fn endpoint(&self, query: &FeedQuery) -> String {
        let cgi = query.cgi_prefix.as_deref().unwrap_or(&self.cgi_prefix);
        format!("{}{}/appfeed.sh", self.base(query.use_tls), cgi)
    }

    pub fn url(&self, query: &FeedQuery) -> Result<Url, FeedError> {
        let filter = query.filter();
        Ok(Url::parse_with_params(&self.endpoint(query), &[("filter", filter.as_str())])?)
    }

    /// Fetch and parse the feed, keeping the cause of any failure.
    pub fn fetch(&self, query: &FeedQuery) -> Result<Vec<StatusRecord>, FeedError> {
        let url = self.url(query)?;
        debug!(%url, "fetching appfeed");
        let resp = self.http.get(url).send().and_then(|resp| resp.error_for_status())?;
        let charset = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(feed::charset_param)
            .map(str::to_string);
        let body = resp.bytes()?;
        let xml = decode_feed(&body, charset.as_deref());
        Ok(parse_feed(&xml, &self.base(query.use_tls))?)
    }

    /// Statuses by host, then by test. Always holds at least one record.
    pub fn query(&self, query: &FeedQuery) -> StatusCollection {
        let host = query.host.as_deref();
        let test = query.test.as_deref();
        match self.fetch(query) {
            Ok(records) if records.is_empty() => {
                let summary = format!(
                    "no data for {}.{}",
                    host.unwrap_or(feed::NO_HOST),
                    test.unwrap_or(feed::NO_TEST)
                );
                StatusCollection::placeholder(host, test, UNMONITORED, summary)
            }
            Ok(records) => StatusCollection::from_records(records),
            Err(FeedError::Parse(e)) => {
                warn!(error = %e, "unusable appfeed response");
                StatusCollection::placeholder(host, test, UNKNOWN, PARSE_ERROR_SUMMARY)
            }
            Err(e) => {
                let endpoint = self.endpoint(query);
                warn!(%endpoint, error = %e, "appfeed request failed");
                let summary = format!("Error getting data from {}", endpoint);
                StatusCollection::placeholder(host, test, UNKNOWN, summary)
            }
        }
    }

    /// Status string of a single host/test, or `"unknown"` when the feed has no such pair.
    pub fn status(&self, host: &str, test: &str) -> String {
        self.status_with_tls(host, test, true)
    }

    pub fn status_with_tls(&self, host: &str, test: &str, use_tls: bool) -> String {
        self.status_with(host, test, FeedQuery::default().use_tls(use_tls))
    }

    /// Like [`FeedClient::status`], taking scheme and CGI prefix from `base`.
    /// Host and test in `base` are replaced; colors are kept.
    pub fn status_with(&self, host: &str, test: &str, base: FeedQuery) -> String {
        let query = base.host(host).test(test);
        self.query(&query)
            .get(host, test)
            .map(|r| r.status.clone())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

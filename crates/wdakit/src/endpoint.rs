//! URL construction for agent routes.
//!
//! An [`Endpoint`] is an immutable base URL. Device-root requests use the
//! endpoint the [`Client`](crate::Client) was built with; a session re-roots
//! it under `/session/{id}` with [`Endpoint::child`]. Route URLs are produced
//! with [`Endpoint::join`] and [`Endpoint::join_wda`], which join path
//! segments rather than concatenating strings, so stray slashes in the base
//! path or in the segments never produce empty segments.
//!
//! ```
//! use wdakit::endpoint::Endpoint;
//!
//! let session = Endpoint::parse("http://localhost:8100/session/S/").unwrap();
//! assert_eq!(
//!     session.join_wda(&["tap", "0"]),
//!     "http://localhost:8100/session/S/wda/tap/0"
//! );
//! ```

use url::Url;

use crate::error::Result;

/// The protocol namespace segment WebDriverAgent uses for its own routes.
pub const WDA_SEGMENT: &str = "wda";

/// An immutable base URL for a device, session or element scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parses a base URL such as `http://localhost:8100`.
    pub fn parse(base: &str) -> Result<Self> {
        Ok(Self {
            url: Url::parse(base)?,
        })
    }

    /// Wraps an already parsed URL.
    pub fn from_url(url: Url) -> Self {
        Self { url }
    }

    /// The underlying URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Joins `elems` onto the endpoint's path and returns the full URL.
    pub fn join(&self, elems: &[&str]) -> String {
        self.build(false, elems).to_string()
    }

    /// Like [`join`](Self::join), but inserts the `wda` segment directly
    /// after the endpoint's own path.
    ///
    /// When `elems` already starts with `wda` the segment is not repeated.
    pub fn join_wda(&self, elems: &[&str]) -> String {
        self.build(true, elems).to_string()
    }

    /// Returns a new endpoint re-rooted under `elems`, e.g.
    /// `child(&["session", id])`. The receiver is not modified.
    pub fn child(&self, elems: &[&str]) -> Endpoint {
        Endpoint {
            url: self.build(false, elems),
        }
    }

    /// Returns a copy of the endpoint with the given query pairs set.
    pub fn with_query<'a, I>(&self, pairs: I) -> Endpoint
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut url = self.url.clone();
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Endpoint { url }
    }

    fn build(&self, wda: bool, elems: &[&str]) -> Url {
        let mut segments: Vec<&str> = split_segments(self.url.path()).collect();
        let mut rest = elems.iter().flat_map(|e| split_segments(e)).peekable();
        if wda && rest.peek() != Some(&WDA_SEGMENT) {
            segments.push(WDA_SEGMENT);
        }
        segments.extend(rest);

        let mut url = self.url.clone();
        url.set_path(&format!("/{}", segments.join("/")));
        url
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ".")
}

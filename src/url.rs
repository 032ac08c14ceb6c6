//! Parsed request URL and the stock `parse_url` responder.

use crate::chain::Step;
use crate::store::Store;

/// The request target broken into path and query pairs.
///
/// Populated onto the store by [`parse_url`]; the router responder reads the
/// path from here rather than from the raw request line.
pub struct ParsedUrl {
    path: String,
    raw_query: Option<String>,
    query: Vec<(String, String)>,
}

impl ParsedUrl {
    pub(crate) fn from_uri(uri: &http::Uri) -> Self {
        let raw_query = uri.query().map(str::to_owned);
        let query = raw_query
            .as_deref()
            .map(parse_query)
            .unwrap_or_default();
        Self {
            path: uri.path().to_owned(),
            raw_query,
            query,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query string as received, without the leading `?`.
    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    /// First value for a query key. A key without `=` yields `Some("")`.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Splits `a=1&b=2` into pairs. No percent-decoding — bytes pass through the
/// way the transport delivered them.
fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_owned(), v.to_owned()),
            None => (pair.to_owned(), String::new()),
        })
        .collect()
}

/// Stock first-link responder: derives [`ParsedUrl`] from the request URI and
/// stores it. The router responder requires this to have run earlier in the
/// chain.
pub async fn parse_url(mut store: Store) -> Step {
    let url = ParsedUrl::from_uri(store.uri());
    store.set_url(url);
    store.next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(target: &str) -> ParsedUrl {
        ParsedUrl::from_uri(&target.parse::<http::Uri>().unwrap())
    }

    #[test]
    fn path_and_query_split() {
        let u = url("/users/42?active=1&sort=name&flag");
        assert_eq!(u.path(), "/users/42");
        assert_eq!(u.raw_query(), Some("active=1&sort=name&flag"));
        assert_eq!(u.query("active"), Some("1"));
        assert_eq!(u.query("sort"), Some("name"));
        assert_eq!(u.query("flag"), Some(""));
        assert_eq!(u.query("missing"), None);
    }

    #[test]
    fn no_query_is_empty() {
        let u = url("/plain");
        assert_eq!(u.path(), "/plain");
        assert_eq!(u.raw_query(), None);
        assert_eq!(u.query_pairs().count(), 0);
    }

    #[tokio::test]
    async fn parse_url_populates_the_store() {
        let req = http::Request::builder()
            .uri("/a/b?x=9")
            .body(bytes::Bytes::new())
            .unwrap();
        let store = Store::from_request(req);
        assert!(store.url().is_none());

        let Step::Continue(store) = parse_url(store).await else {
            panic!("parse_url must continue");
        };
        let parsed = store.url().unwrap();
        assert_eq!(parsed.path(), "/a/b");
        assert_eq!(parsed.query("x"), Some("9"));
    }
}

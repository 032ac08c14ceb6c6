//! Per-request context ("the store").
//!
//! One [`Store`] is built per incoming request and threaded through the
//! responder chain by value: each responder takes ownership, reads or mutates
//! it, and hands it back inside a [`Step`]. That ownership transfer is what
//! makes the sequential-execution contract a compile-time fact — no two
//! responders can touch one request's store at the same time.
//!
//! Fields populated by stock responders are explicit `Option`s rather than a
//! string-keyed bag: [`Store::url`] is set by [`parse_url`](crate::parse_url),
//! path params by the router responder. A responder that needs one of them
//! before its producer has run gets a loud [`Step::Failed`], not a silent
//! `None` probe. Anything else handlers want to pass forward travels in the
//! typed [data bag](Store::set).

use std::net::SocketAddr;

use bytes::Bytes;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::upgrade::OnUpgrade;

use crate::chain::Step;
use crate::error::Error;
use crate::response::{IntoResponse, Response};
use crate::trie::WILDCARD;
use crate::url::ParsedUrl;

/// Path parameters captured by the router, in declaration order.
pub struct PathParams {
    pairs: Vec<(String, String)>,
}

impl PathParams {
    pub(crate) fn new(names: &[String], values: Vec<String>) -> Self {
        let pairs = names.iter().cloned().zip(values).collect();
        Self { pairs }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The request body, whichever side of collection it is on.
enum BodySlot {
    Incoming(Incoming),
    Full(Bytes),
}

/// The per-request mutable context threaded through the chain.
///
/// Exclusively owned by one request's chain run; discarded after the
/// finalizer returns it for the last time.
pub struct Store {
    parts: Parts,
    body: BodySlot,
    peer: SocketAddr,
    upgrade: Option<OnUpgrade>,
    /// Set by the `parse_url` responder. The router requires it.
    url: Option<ParsedUrl>,
    /// Set by the router responder on a route hit.
    params: Option<PathParams>,
    /// The terminal-response slot. `Some` means the chain short-circuits.
    response: Option<Response>,
    data: Extensions,
}

impl Store {
    pub(crate) fn from_hyper(
        mut req: http::Request<Incoming>,
        peer: SocketAddr,
    ) -> Self {
        let upgrade = hyper::upgrade::on(&mut req);
        let (parts, body) = req.into_parts();
        Self {
            parts,
            body: BodySlot::Incoming(body),
            peer,
            upgrade: Some(upgrade),
            url: None,
            params: None,
            response: None,
            data: Extensions::new(),
        }
    }

    /// Builds a store from a plain request, for driving handlers and chains
    /// without a live connection (tests, offline dispatch). The peer address
    /// is the unspecified loopback.
    pub fn from_request(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            parts,
            body: BodySlot::Full(body),
            peer: SocketAddr::from(([127, 0, 0, 1], 0)),
            upgrade: None,
            url: None,
            params: None,
            response: None,
            data: Extensions::new(),
        }
    }

    // ── Raw request handles ──────────────────────────────────────────────────

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// The raw request-target path, straight off the wire. Prefer
    /// [`url()`](Store::url) once `parse_url` has run.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn uri(&self) -> &http::Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Case-insensitive header lookup; `None` for absent or non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Collects the request body, suspending until the transport delivers it.
    /// The collected bytes are cached; repeat calls are free.
    pub async fn read_body(&mut self) -> Result<Bytes, Error> {
        match std::mem::replace(&mut self.body, BodySlot::Full(Bytes::new())) {
            BodySlot::Incoming(incoming) => {
                let bytes = incoming.collect().await?.to_bytes();
                self.body = BodySlot::Full(bytes.clone());
                Ok(bytes)
            }
            BodySlot::Full(bytes) => {
                self.body = BodySlot::Full(bytes.clone());
                Ok(bytes)
            }
        }
    }

    /// Takes the connection's upgrade handle, if any remains. Used by upgrade
    /// handlers; succeeds at most once per request.
    pub fn take_upgrade(&mut self) -> Option<OnUpgrade> {
        self.upgrade.take()
    }

    // ── Derived state ────────────────────────────────────────────────────────

    pub fn url(&self) -> Option<&ParsedUrl> {
        self.url.as_ref()
    }

    pub(crate) fn set_url(&mut self, url: ParsedUrl) {
        self.url = Some(url);
    }

    pub fn params(&self) -> Option<&PathParams> {
        self.params.as_ref()
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = Some(params);
    }

    /// Value of a named `:param` captured by the router.
    ///
    /// For a route `/users/:id`, `store.param("id")` on `/users/42` returns
    /// `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.as_ref()?.get(name)
    }

    /// The trailing-`*` capture: every remaining path segment joined by `/`.
    pub fn wildcard(&self) -> Option<&str> {
        self.params.as_ref()?.get(WILDCARD)
    }

    // ── Data bag ─────────────────────────────────────────────────────────────

    /// Stores a value for downstream responders, keyed by type. One value per
    /// type; inserting again replaces it.
    pub fn set<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.data.insert(value);
    }

    /// Reads a value a previous responder [`set`](Store::set).
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<&T> {
        self.data.get::<T>()
    }

    // ── Chain control ────────────────────────────────────────────────────────

    /// Stores a terminal response and short-circuits the chain.
    pub fn send(mut self, response: impl IntoResponse) -> Step {
        self.response = Some(response.into_response());
        Step::Terminal(self)
    }

    /// Passes control to the next responder.
    pub fn next(self) -> Step {
        Step::Continue(self)
    }

    /// Aborts the chain with an error. Remaining responders are skipped; the
    /// finalizer still runs and sees both the store and the error.
    pub fn fail(self, error: Error) -> Step {
        Step::Failed(self, error)
    }

    /// Whether a terminal response has been stored.
    pub fn is_terminal(&self) -> bool {
        self.response.is_some()
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn store(method: Method, target: &str) -> Store {
        let req = http::Request::builder()
            .method(method)
            .uri(target)
            .header("X-Custom", "yes")
            .body(Bytes::from_static(b"hello"))
            .unwrap();
        Store::from_request(req)
    }

    #[test]
    fn raw_accessors() {
        let s = store(Method::POST, "/users?a=1");
        assert_eq!(*s.method(), Method::POST);
        assert_eq!(s.path(), "/users");
        assert_eq!(s.header("x-custom"), Some("yes"));
        assert_eq!(s.header("missing"), None);
    }

    #[tokio::test]
    async fn body_reads_are_cached() {
        let mut s = store(Method::POST, "/");
        assert_eq!(s.read_body().await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(s.read_body().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn send_is_terminal() {
        let s = store(Method::GET, "/");
        assert!(!s.is_terminal());
        let step = s.send(StatusCode::NO_CONTENT);
        let Step::Terminal(s) = step else { panic!("expected terminal") };
        assert!(s.is_terminal());
        assert_eq!(s.response().unwrap().status_code(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn params_resolve_by_name_and_wildcard() {
        let mut s = store(Method::GET, "/files/a/b");
        s.set_params(PathParams::new(
            &["kind".to_owned(), WILDCARD.to_owned()],
            vec!["img".to_owned(), "a/b".to_owned()],
        ));
        assert_eq!(s.param("kind"), Some("img"));
        assert_eq!(s.wildcard(), Some("a/b"));
        assert_eq!(s.param("nope"), None);
    }

    #[test]
    fn data_bag_is_typed() {
        #[derive(Clone, PartialEq, Debug)]
        struct UserId(u64);

        let mut s = store(Method::GET, "/");
        assert!(s.get::<UserId>().is_none());
        s.set(UserId(7));
        assert_eq!(s.get::<UserId>(), Some(&UserId(7)));
    }
}

//! WebSocket-upgrade routing.
//!
//! The same trie and matching algorithm as the HTTP router, instantiated with
//! a different handler type: an [`UpgradeHandler`] receives the store *and*
//! the connection's [`OnUpgrade`] handle, performs the handshake response,
//! and takes over the raw I/O once hyper completes the switch. Routing is
//! agnostic to all of that — it matches a path and a method, nothing more.
//!
//! Frame parsing, masking, and handshake-key computation stay in the handler
//! (or the crate it delegates to); this module only decides *which* handler
//! gets the connection.

use std::future::Future;
use std::sync::Arc;

use http::Method;
use hyper::upgrade::OnUpgrade;

use crate::chain::{BoxFuture, Responder, Step};
use crate::error::{Error, RouteError};
use crate::router::Router;
use crate::store::{PathParams, Store};

// ── Handler erasure ───────────────────────────────────────────────────────────

#[doc(hidden)]
pub trait ErasedUpgrade {
    fn call(&self, store: Store, upgrade: OnUpgrade) -> BoxFuture<Step>;
}

#[doc(hidden)]
pub type BoxedUpgrade = Arc<dyn ErasedUpgrade + Send + Sync + 'static>;

/// Implemented for every valid upgrade handler — any `async fn` with the
/// signature:
///
/// ```text
/// async fn name(store: Store, upgrade: OnUpgrade) -> Step
/// ```
///
/// The handler typically sends the `101 Switching Protocols` response via
/// `store.send(..)` and spawns a task that awaits `upgrade` for the raw I/O.
/// Sealed, like [`Responder`](crate::Responder).
pub trait UpgradeHandler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_upgrade(self) -> BoxedUpgrade;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut> private::Sealed for F
where
    F: Fn(Store, OnUpgrade) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Step> + Send + 'static,
{
}

impl<F, Fut> UpgradeHandler for F
where
    F: Fn(Store, OnUpgrade) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Step> + Send + 'static,
{
    fn into_boxed_upgrade(self) -> BoxedUpgrade {
        Arc::new(FnUpgrade(self))
    }
}

struct FnUpgrade<F>(F);

impl<F, Fut> ErasedUpgrade for FnUpgrade<F>
where
    F: Fn(Store, OnUpgrade) -> Fut + Send + Sync,
    Fut: Future<Output = Step> + Send + 'static,
{
    fn call(&self, store: Store, upgrade: OnUpgrade) -> BoxFuture<Step> {
        Box::pin((self.0)(store, upgrade))
    }
}

// ── UpgradeRouter ─────────────────────────────────────────────────────────────

/// Routes upgrade requests to upgrade handlers over the shared trie.
///
/// Its responder engages only for requests whose headers ask for a protocol
/// switch (`connection: upgrade` plus an `upgrade:` token); everything else
/// falls through untouched, so the upgrade router composes freely with the
/// HTTP router in one chain.
pub struct UpgradeRouter {
    inner: Router<BoxedUpgrade>,
}

impl UpgradeRouter {
    pub fn new() -> Self {
        Self { inner: Router::new() }
    }

    /// Register an upgrade handler for `pattern`. Upgrade requests arrive as
    /// `GET`; use [`on_method`](UpgradeRouter::on_method) for anything else.
    ///
    /// # Panics
    ///
    /// Panics on any [`RouteError`], like the HTTP router.
    pub fn on(self, pattern: &str, handler: impl UpgradeHandler) -> Self {
        self.on_method(Method::GET, pattern, handler)
    }

    pub fn on_method(self, method: Method, pattern: &str, handler: impl UpgradeHandler) -> Self {
        Self {
            inner: self
                .inner
                .route(&[method], &[pattern], handler.into_boxed_upgrade()),
        }
    }

    /// Non-panicking registration.
    pub fn try_on(&mut self, pattern: &str, handler: impl UpgradeHandler) -> Result<(), RouteError> {
        self.inner
            .try_route(&[Method::GET], &[pattern], handler.into_boxed_upgrade())
    }

    /// Converts the upgrade router into one chain link. Requires
    /// [`parse_url`](crate::parse_url) earlier in the chain.
    pub fn into_responder(self) -> impl Responder {
        let router = Arc::new(self.inner);
        move |mut store: Store| {
            let router = Arc::clone(&router);
            async move {
                if !wants_upgrade(&store) {
                    return store.next();
                }
                let Some(url) = store.url() else {
                    return store.fail(Error::chain("upgrade router ran before parse_url"));
                };
                match router.trie().at(url.path(), store.method()) {
                    Some(matched) => {
                        let params =
                            PathParams::new(&matched.entry.param_names, matched.param_values);
                        let handler = Arc::clone(&matched.entry.value);
                        store.set_params(params);
                        let Some(upgrade) = store.take_upgrade() else {
                            return store.fail(Error::chain("connection has no upgrade handle"));
                        };
                        handler.call(store, upgrade).await
                    }
                    None => store.next(),
                }
            }
        }
    }
}

impl Default for UpgradeRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Header-level upgrade check: a `connection` header carrying the `upgrade`
/// token plus an `upgrade` header naming the target protocol.
fn wants_upgrade(store: &Store) -> bool {
    let connection = store.header("connection").unwrap_or("");
    connection
        .split(',')
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        && store.header("upgrade").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::url::parse_url;
    use bytes::Bytes;
    use http::StatusCode;

    async fn ws_echo(store: Store, _upgrade: OnUpgrade) -> Step {
        store.send(StatusCode::SWITCHING_PROTOCOLS)
    }

    fn ws_request(target: &str) -> Store {
        let req = http::Request::builder()
            .method(Method::GET)
            .uri(target)
            .header("connection", "keep-alive, Upgrade")
            .header("upgrade", "websocket")
            .body(Bytes::new())
            .unwrap();
        Store::from_request(req)
    }

    fn plain_request(target: &str) -> Store {
        let req = http::Request::builder()
            .method(Method::GET)
            .uri(target)
            .body(Bytes::new())
            .unwrap();
        Store::from_request(req)
    }

    #[tokio::test]
    async fn plain_requests_fall_through_even_on_matching_paths() {
        let chain = Chain::new()
            .link(parse_url)
            .link(UpgradeRouter::new().on("/ws/:room", ws_echo).into_responder())
            .link(crate::not_found);

        let (store, error) = chain.run(plain_request("/ws/lobby")).await;
        assert!(error.is_none());
        assert_eq!(store.response().unwrap().status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unrouted_upgrade_requests_fall_through() {
        let chain = Chain::new()
            .link(parse_url)
            .link(UpgradeRouter::new().on("/ws/:room", ws_echo).into_responder())
            .link(crate::not_found);

        let (store, error) = chain.run(ws_request("/elsewhere")).await;
        assert!(error.is_none());
        assert_eq!(store.response().unwrap().status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn matched_upgrade_without_a_live_connection_fails_loudly() {
        // Synthetic stores carry no upgrade handle; a routed upgrade request
        // must surface that as a chain failure, not a silent fall-through.
        let chain = Chain::new()
            .link(parse_url)
            .link(UpgradeRouter::new().on("/ws/:room", ws_echo).into_responder())
            .link(crate::not_found);

        let (store, error) = chain.run(ws_request("/ws/lobby")).await;
        assert!(matches!(error, Some(Error::Chain(_))));
        // params were still captured before the failure
        assert_eq!(store.param("room"), Some("lobby"));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn duplicate_upgrade_route_panics_at_startup() {
        let _ = UpgradeRouter::new()
            .on("/ws/*", ws_echo)
            .on("/ws/*", ws_echo);
    }
}

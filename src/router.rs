//! Route registration and the HTTP router responder.
//!
//! [`Router`] is a thin build API over the route trie, generic over what it
//! stores — the HTTP instantiation holds chain responders, the WebSocket
//! [`UpgradeRouter`](crate::UpgradeRouter) holds upgrade handlers, and both
//! share one matching algorithm. Build it once at startup; registrations
//! chain naturally because every method returns `self`.

use std::sync::Arc;

use http::Method;

use crate::chain::{BoxedResponder, ErasedResponder as _, Responder, Step};
use crate::error::{Error, RouteError};
use crate::store::{PathParams, Store};
use crate::trie::RouteTrie;

/// The application router.
///
/// Pattern syntax: segments separated by `/`; `:name` captures one segment;
/// a trailing `*` captures everything that remains. Registration failures are
/// configuration bugs and panic — they must abort startup, not surface per
/// request. Use [`try_route`](Router::try_route) for a `Result` instead.
///
/// ```rust,no_run
/// # use strand::{Router, Store, Step, Response};
/// # async fn get_user(store: Store) -> Step { store.send(Response::text("")) }
/// # async fn create_user(store: Store) -> Step { store.send(Response::text("")) }
/// let router = Router::new()
///     .get("/users/:id", get_user)
///     .post("/users",    create_user);
/// ```
pub struct Router<H = BoxedResponder> {
    trie: RouteTrie<H>,
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Self { trie: RouteTrie::new() }
    }

    /// Registers `value` under every pattern in `patterns`, for every method
    /// in `methods` — the multi-pattern form is sugar for one registration
    /// per pattern sharing one handler.
    pub fn try_route(
        &mut self,
        methods: &[Method],
        patterns: &[&str],
        value: H,
    ) -> Result<(), RouteError>
    where
        H: Clone,
    {
        for pattern in patterns {
            self.trie.register(pattern, methods, value.clone())?;
        }
        Ok(())
    }

    /// Chaining form of [`try_route`](Router::try_route).
    ///
    /// # Panics
    ///
    /// Panics on any [`RouteError`] — duplicate routes, conflicting param
    /// names, non-terminal wildcards.
    pub fn route(mut self, methods: &[Method], patterns: &[&str], value: H) -> Self
    where
        H: Clone,
    {
        self.try_route(methods, patterns, value)
            .unwrap_or_else(|e| panic!("invalid route: {e}"));
        self
    }

    pub(crate) fn trie(&self) -> &RouteTrie<H> {
        &self.trie
    }
}

impl Router<BoxedResponder> {
    /// Register a handler for a method + pattern pair.
    pub fn on(self, method: Method, pattern: &str, handler: impl Responder) -> Self {
        self.route(&[method], &[pattern], handler.into_boxed_responder())
    }

    /// Register one handler for several methods and/or several patterns.
    pub fn on_all(self, methods: &[Method], patterns: &[&str], handler: impl Responder) -> Self {
        self.route(methods, patterns, handler.into_boxed_responder())
    }

    pub fn get(self, pattern: &str, handler: impl Responder) -> Self {
        self.on(Method::GET, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Responder) -> Self {
        self.on(Method::POST, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Responder) -> Self {
        self.on(Method::PUT, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Responder) -> Self {
        self.on(Method::DELETE, pattern, handler)
    }

    /// Converts the router into one chain link.
    ///
    /// On a hit the captured params land in the store and the matched handler
    /// runs in the router's place — it is an ordinary responder and decides
    /// for itself whether to terminate. On a miss the request falls through
    /// untouched to the next link (conventionally [`not_found`](crate::not_found)).
    ///
    /// Requires [`parse_url`](crate::parse_url) earlier in the chain; running
    /// without it is an ordering bug and fails the request loudly.
    pub fn into_responder(self) -> impl Responder {
        let trie = Arc::new(self.trie);
        move |mut store: Store| {
            let trie = Arc::clone(&trie);
            async move {
                let Some(url) = store.url() else {
                    return store.fail(Error::chain("router ran before parse_url"));
                };
                match trie.at(url.path(), store.method()) {
                    Some(matched) => {
                        let params =
                            PathParams::new(&matched.entry.param_names, matched.param_values);
                        let handler = Arc::clone(&matched.entry.value);
                        store.set_params(params);
                        handler.call(store).await
                    }
                    None => store.next(),
                }
            }
        }
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;
    use crate::url::parse_url;
    use bytes::Bytes;
    use http::StatusCode;

    fn request(method: Method, target: &str) -> Store {
        let req = http::Request::builder()
            .method(method)
            .uri(target)
            .body(Bytes::new())
            .unwrap();
        Store::from_request(req)
    }

    async fn echo_id(store: Store) -> Step {
        let id = store.param("id").unwrap_or("none").to_owned();
        store.send(crate::Response::text(id))
    }

    #[tokio::test]
    async fn hit_fills_params_and_delegates() {
        let chain = Chain::new()
            .link(parse_url)
            .link(Router::new().get("/users/:id", echo_id).into_responder());

        let (store, error) = chain.run(request(Method::GET, "/users/42?x=1")).await;
        assert!(error.is_none());
        assert_eq!(store.response().unwrap().body(), b"42");
    }

    #[tokio::test]
    async fn miss_falls_through_to_next_link() {
        let chain = Chain::new()
            .link(parse_url)
            .link(Router::new().get("/users/:id", echo_id).into_responder())
            .link(crate::not_found);

        let (store, error) = chain.run(request(Method::GET, "/nope")).await;
        assert!(error.is_none());
        assert_eq!(store.response().unwrap().status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn method_mismatch_falls_through() {
        let chain = Chain::new()
            .link(parse_url)
            .link(Router::new().get("/users/:id", echo_id).into_responder())
            .link(crate::not_found);

        let (store, _) = chain.run(request(Method::POST, "/users/42")).await;
        assert_eq!(store.response().unwrap().status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn router_without_parse_url_fails_the_request() {
        let chain = Chain::new()
            .link(Router::new().get("/users/:id", echo_id).into_responder());

        let (store, error) = chain.run(request(Method::GET, "/users/42")).await;
        assert!(matches!(error, Some(Error::Chain(_))));
        assert!(!store.is_terminal());
    }

    #[tokio::test]
    async fn one_handler_many_verbs_and_patterns() {
        async fn ok(store: Store) -> Step {
            store.send(StatusCode::OK)
        }

        let router = Router::new()
            .on_all(&[Method::GET, Method::POST], &["/", "/test/"], ok)
            .into_responder();
        let chain = Chain::new().link(parse_url).link(router).link(crate::not_found);

        for (method, target, expect) in [
            (Method::GET, "/", StatusCode::OK),
            (Method::POST, "/test/", StatusCode::OK),
            (Method::DELETE, "/", StatusCode::NOT_FOUND),
            (Method::GET, "/other", StatusCode::NOT_FOUND),
        ] {
            let (store, _) = chain.run(request(method, target)).await;
            assert_eq!(store.response().unwrap().status_code(), expect, "{target}");
        }
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn duplicate_registration_panics_at_startup() {
        let _ = Router::new()
            .get("/test", echo_id)
            .get("/test", echo_id);
    }

    #[tokio::test]
    async fn wildcard_capture_reaches_handlers() {
        async fn tail(store: Store) -> Step {
            let tail = store.wildcard().unwrap_or("").to_owned();
            store.send(crate::Response::text(tail))
        }

        let chain = Chain::new()
            .link(parse_url)
            .link(Router::new().get("/files/*", tail).into_responder());

        let (store, _) = chain.run(request(Method::GET, "/files/a/b/c")).await;
        assert_eq!(store.response().unwrap().body(), b"a/b/c");
    }
}

//! The responder chain.
//!
//! A [`Chain`] is an ordered list of responders run one at a time against a
//! single request's [`Store`], followed by exactly one finalizer. Each
//! responder takes the store by value and returns it inside a [`Step`]:
//!
//! - [`Step::Continue`] — not my request, pass it on;
//! - [`Step::Terminal`] — a response was stored, stop here;
//! - [`Step::Failed`] — something broke, stop here, keep the store so the
//!   finalizer can still see the request.
//!
//! The finalizer runs exactly once per request — after natural completion,
//! after a short-circuit, and after a failure alike — which is what makes it
//! the right home for access logging and cleanup.
//!
//! # How responders are stored
//!
//! The chain holds responders of *different* concrete types in one `Vec`, so
//! each is erased behind `Arc<dyn ErasedResponder>`:
//!
//! ```text
//! async fn hello(store: Store) -> Step { … }       ← user writes this
//!        ↓ chain.link(hello)
//! hello.into_boxed_responder()                     ← Responder blanket impl
//!        ↓
//! Arc::new(FnResponder(hello))                     ← heap-allocated wrapper
//!        ↓  stored as BoxedResponder = Arc<dyn ErasedResponder>
//! responder.call(store)  at request time           ← one vtable dispatch
//! ```
//!
//! The only runtime cost per link is one `Arc` clone and one virtual call —
//! negligible compared to network I/O.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;
use tracing::{error, info};

use crate::error::Error;
use crate::store::Store;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future. `Pin<Box<…>>` because the runtime
/// polls it in place; `Send + 'static` so tokio may move it across threads.
#[doc(hidden)]
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Internal dispatch interface for responders.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Responder` trait's method. External crates
/// cannot usefully interact with it.
#[doc(hidden)]
pub trait ErasedResponder {
    fn call(&self, store: Store) -> BoxFuture<Step>;
}

/// A type-erased responder shared across concurrent requests.
#[doc(hidden)]
pub type BoxedResponder = Arc<dyn ErasedResponder + Send + Sync + 'static>;

#[doc(hidden)]
pub trait ErasedFinalizer {
    fn call(&self, store: Store, error: Option<Error>) -> BoxFuture<(Store, Option<Error>)>;
}

#[doc(hidden)]
pub type BoxedFinalizer = Arc<dyn ErasedFinalizer + Send + Sync + 'static>;

// ── Step ─────────────────────────────────────────────────────────────────────

/// The tagged result every responder returns.
///
/// Control flow is explicit and total: the store always comes back, so the
/// chain can keep threading it — into the next responder, or straight to the
/// finalizer.
pub enum Step {
    /// Not handled here; run the next responder.
    Continue(Store),
    /// A terminal response was produced; skip the remaining responders.
    Terminal(Store),
    /// The responder failed; skip the remaining responders. The finalizer
    /// still sees the store and the error.
    Failed(Store, Error),
}

// ── Responder trait ───────────────────────────────────────────────────────────

/// Implemented for every valid chain link.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the signature:
///
/// ```text
/// async fn name(store: Store) -> Step
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Responder: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_responder(self) -> BoxedResponder;
}

/// Implemented for every valid finalizer.
///
/// Automatically satisfied for:
///
/// ```text
/// async fn name(store: Store, error: Option<Error>) -> (Store, Option<Error>)
/// ```
///
/// The finalizer owns the error for its duration and hands it back, so the
/// caller wrapping the chain can still distinguish "fell through" from
/// "failed" after finalization.
pub trait Finalizer: private::SealedFinalizer + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_finalizer(self) -> BoxedFinalizer;
}

/// The sealing module. Because these traits are private, external crates
/// cannot name them and therefore cannot implement `Responder`/`Finalizer`
/// on their own types.
mod private {
    pub trait Sealed {}
    pub trait SealedFinalizer {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut> private::Sealed for F
where
    F: Fn(Store) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Step> + Send + 'static,
{
}

impl<F, Fut> Responder for F
where
    F: Fn(Store) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Step> + Send + 'static,
{
    fn into_boxed_responder(self) -> BoxedResponder {
        Arc::new(FnResponder(self))
    }
}

impl<F, Fut> private::SealedFinalizer for F
where
    F: Fn(Store, Option<Error>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (Store, Option<Error>)> + Send + 'static,
{
}

impl<F, Fut> Finalizer for F
where
    F: Fn(Store, Option<Error>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (Store, Option<Error>)> + Send + 'static,
{
    fn into_boxed_finalizer(self) -> BoxedFinalizer {
        Arc::new(FnFinalizer(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

/// Newtype bridging a concrete responder fn to the trait-object world.
struct FnResponder<F>(F);

impl<F, Fut> ErasedResponder for FnResponder<F>
where
    F: Fn(Store) -> Fut + Send + Sync,
    Fut: Future<Output = Step> + Send + 'static,
{
    fn call(&self, store: Store) -> BoxFuture<Step> {
        Box::pin((self.0)(store))
    }
}

struct FnFinalizer<F>(F);

impl<F, Fut> ErasedFinalizer for FnFinalizer<F>
where
    F: Fn(Store, Option<Error>) -> Fut + Send + Sync,
    Fut: Future<Output = (Store, Option<Error>)> + Send + 'static,
{
    fn call(&self, store: Store, error: Option<Error>) -> BoxFuture<(Store, Option<Error>)> {
        Box::pin((self.0)(store, error))
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// An ordered responder chain with a guaranteed finalizer.
///
/// Build it once at startup; it is shared read-only across every in-flight
/// request. The conventional composition is
/// `parse_url → router → not_found`, with the default access-log finalizer:
///
/// ```rust,no_run
/// use strand::{parse_url, not_found, Chain, Router};
///
/// # let router = Router::new();
/// let app = Chain::new()
///     .link(parse_url)
///     .link(router.into_responder())
///     .link(not_found);
/// ```
pub struct Chain {
    responders: Vec<BoxedResponder>,
    finalizer: BoxedFinalizer,
}

impl Chain {
    /// An empty chain with the default access-log finalizer.
    pub fn new() -> Self {
        Self {
            responders: Vec::new(),
            finalizer: access_log.into_boxed_finalizer(),
        }
    }

    /// Appends a responder. Order is execution order.
    pub fn link(mut self, responder: impl Responder) -> Self {
        self.responders.push(responder.into_boxed_responder());
        self
    }

    /// Replaces the default finalizer.
    pub fn finalize_with(mut self, finalizer: impl Finalizer) -> Self {
        self.finalizer = finalizer.into_boxed_finalizer();
        self
    }

    /// Runs one request's store through the chain.
    ///
    /// Responders execute strictly in registration order and never
    /// concurrently for one request — each must return the store before the
    /// next sees it. The loop stops at the first [`Step::Terminal`] or
    /// [`Step::Failed`]; the finalizer then runs exactly once in every case
    /// and its output is returned as-is.
    pub async fn run(&self, mut store: Store) -> (Store, Option<Error>) {
        let mut error = None;

        for responder in &self.responders {
            match responder.call(store).await {
                Step::Continue(next) => store = next,
                Step::Terminal(next) => {
                    store = next;
                    break;
                }
                Step::Failed(next, e) => {
                    store = next;
                    error = Some(e);
                    break;
                }
            }
        }

        self.finalizer.call(store, error).await
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

// ── Stock links ───────────────────────────────────────────────────────────────

/// Stock fall-through responder: terminal `404 Not Found`.
///
/// Conventionally the last link, so every unrouted request still gets exactly
/// one response.
pub async fn not_found(store: Store) -> Step {
    store.send(StatusCode::NOT_FOUND)
}

/// The default finalizer: one access-log line per request.
pub async fn access_log(store: Store, error: Option<Error>) -> (Store, Option<Error>) {
    let status = store.response().map(|r| r.status_code().as_u16());
    match (&error, status) {
        (Some(e), _) => error!(
            method = %store.method(),
            path = store.path(),
            peer = %store.peer(),
            "request failed: {e}"
        ),
        (None, Some(status)) => info!(
            method = %store.method(),
            path = store.path(),
            peer = %store.peer(),
            status,
            "request served"
        ),
        (None, None) => info!(
            method = %store.method(),
            path = store.path(),
            peer = %store.peer(),
            "request fell through unhandled"
        ),
    }
    (store, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::Method;

    fn store(target: &str) -> Store {
        let req = http::Request::builder()
            .method(Method::GET)
            .uri(target)
            .body(Bytes::new())
            .unwrap();
        Store::from_request(req)
    }

    fn counting_finalizer(hits: Arc<AtomicUsize>) -> impl Finalizer {
        move |store: Store, error: Option<Error>| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (store, error)
            }
        }
    }

    #[tokio::test]
    async fn responders_run_in_registration_order() {
        #[derive(Clone, Default, PartialEq, Debug)]
        struct Trace(Vec<&'static str>);

        fn tag(name: &'static str) -> impl Responder {
            move |mut store: Store| async move {
                let mut trace = store.get::<Trace>().cloned().unwrap_or_default();
                trace.0.push(name);
                store.set(trace);
                store.next()
            }
        }

        let chain = Chain::new().link(tag("a")).link(tag("b")).link(tag("c"));
        let (store, error) = chain.run(store("/")).await;
        assert!(error.is_none());
        assert_eq!(store.get::<Trace>().unwrap().0, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn terminal_short_circuits_remaining_responders() {
        let later = Arc::new(AtomicUsize::new(0));
        let later2 = Arc::clone(&later);

        let chain = Chain::new()
            .link(|store: Store| async move { store.send(StatusCode::OK) })
            .link(move |store: Store| {
                let later = Arc::clone(&later2);
                async move {
                    later.fetch_add(1, Ordering::SeqCst);
                    store.next()
                }
            });

        let (store, error) = chain.run(store("/")).await;
        assert!(error.is_none());
        assert!(store.is_terminal());
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn finalizer_runs_once_on_natural_completion() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = Chain::new()
            .link(|store: Store| async move { store.next() })
            .finalize_with(counting_finalizer(Arc::clone(&hits)));

        let (store, error) = chain.run(store("/")).await;
        assert!(error.is_none());
        assert!(!store.is_terminal());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn finalizer_runs_once_on_short_circuit() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = Chain::new()
            .link(|store: Store| async move { store.send(StatusCode::OK) })
            .link(not_found)
            .finalize_with(counting_finalizer(Arc::clone(&hits)));

        let (store, _) = chain.run(store("/")).await;
        assert_eq!(store.response().unwrap().status_code(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn finalizer_runs_once_on_failure_and_sees_the_error() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);

        let chain = Chain::new()
            .link(|store: Store| async move { store.fail(Error::chain("boom")) })
            .link(not_found)
            .finalize_with(move |store: Store, error: Option<Error>| {
                let hits = Arc::clone(&hits2);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    assert!(matches!(error, Some(Error::Chain(_))));
                    (store, error)
                }
            });

        let (store, error) = chain.run(store("/")).await;
        assert!(error.is_some());
        // failure skipped not_found: no response was produced
        assert!(!store.is_terminal());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_chain_still_finalizes() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = Chain::new().finalize_with(counting_finalizer(Arc::clone(&hits)));
        let (store, error) = chain.run(store("/")).await;
        assert!(error.is_none());
        assert!(!store.is_terminal());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}

//! # strand
//!
//! A composable request-handling framework: a trie-backed path router and a
//! responder chain that threads one per-request [`Store`] through an ordered
//! list of handlers until one produces a terminal response.
//!
//! ## The contract
//!
//! Every request gets one [`Store`]. The [`Chain`] runs its responders in
//! registration order; each takes the store, does its part, and returns a
//! [`Step`] saying continue, stop, or failed. After the chain ends — however
//! it ends — the finalizer runs exactly once. That is the whole model; the
//! router, the URL parser, and your handlers are all just links.
//!
//! What the proxy / ingress in front of you already owns, strand ignores:
//! TLS termination, rate limiting, body-size limits, compression, slow-client
//! protection. What's left is the part that changes between applications:
//!
//! - Trie routing — static, `:param`, and trailing-`*` segments, shared by
//!   HTTP and WebSocket-upgrade routes
//! - The responder chain — sequential, short-circuiting, always finalized
//! - Async I/O — tokio + hyper, HTTP/1.1 and HTTP/2, graceful shutdown
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strand::{parse_url, not_found, Chain, Response, Router, Server, Step, Store};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::new()
//!         .get("/users/:id", get_user)
//!         .get("/files/*",   get_file);
//!
//!     let app = Chain::new()
//!         .link(parse_url)
//!         .link(router.into_responder())
//!         .link(not_found);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(store: Store) -> Step {
//!     let id = store.param("id").unwrap_or("unknown").to_owned();
//!     store.send(Response::json(format!(r#"{{"id":"{id}"}}"#)))
//! }
//!
//! async fn get_file(store: Store) -> Step {
//!     let rest = store.wildcard().unwrap_or("").to_owned();
//!     store.send(Response::text(rest))
//! }
//! ```

mod chain;
mod error;
mod response;
mod router;
mod server;
mod store;
mod trie;
mod upgrade;
mod url;

pub mod health;

pub use chain::{access_log, not_found, Chain, Finalizer, Responder, Step};
pub use error::{Error, RouteError};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use store::{PathParams, Store};
pub use trie::{Match, RouteEntry, RouteTrie, WILDCARD};
pub use upgrade::{UpgradeHandler, UpgradeRouter};
pub use url::{parse_url, ParsedUrl};

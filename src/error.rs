//! Unified error types.
//!
//! Application-level errors (404, 422, etc.) are expressed as HTTP
//! [`Response`](crate::Response) values, not as `Error`s. The types here
//! surface the two other failure classes: configuration bugs caught while the
//! routing table is built, and infrastructure/chain failures at request time.

use std::io;

/// A build-time route-registration error.
///
/// These are configuration bugs. They abort startup — the chaining
/// [`Router`](crate::Router) API panics on them, and the trie-level
/// [`RouteTrie::register`](crate::RouteTrie::register) returns them for
/// callers that want to handle registration programmatically.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteError {
    /// The same terminal pattern was registered twice.
    #[error("duplicate route `{pattern}`")]
    DuplicateRoute { pattern: String },

    /// A `:name` segment is empty, reuses a name already captured by this
    /// pattern, or conflicts with the name a sibling pattern gave the same
    /// param slot.
    #[error("duplicate or conflicting param name `:{name}` in `{pattern}`")]
    DuplicateParamName { pattern: String, name: String },

    /// A `*` segment was followed by further segments. The wildcard captures
    /// everything after it, so nothing can come next.
    #[error("wildcard must be the final segment in `{pattern}`")]
    WildcardNotTerminal { pattern: String },
}

/// The error type carried through the chain and returned by the server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Binding a port, accepting a connection.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// A responder failed, or a chain-ordering contract was violated
    /// (e.g. the router ran before the URL was parsed).
    #[error("chain: {0}")]
    Chain(String),

    /// Collecting the request body from the transport failed.
    #[error("body: {0}")]
    Body(#[from] hyper::Error),
}

impl Error {
    /// Shorthand for a chain-level failure with a plain message.
    pub fn chain(msg: impl Into<String>) -> Self {
        Self::Chain(msg.into())
    }
}

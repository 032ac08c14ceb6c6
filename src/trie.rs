//! Path-segment route trie.
//!
//! Patterns are split on `/` into fragments: literals, `:name` params, and a
//! trailing `*` wildcard. Empty fragments are kept, so `/test` and `/test/`
//! are distinct patterns and a trailing slash in a pattern demands one in the
//! path. The trie is generic over its payload — the HTTP router and the
//! WebSocket upgrade router instantiate the same structure with different
//! handler types.
//!
//! Built once at startup, then read-only: concurrent lookups from in-flight
//! requests share it without locking.

use std::collections::HashMap;

use http::Method;

use crate::error::RouteError;

/// Reserved capture name for the trailing `*` segment.
pub const WILDCARD: &str = "*";

/// One trie node. Child slots are explicit so a literal segment can never
/// collide with a param or wildcard marker.
struct RouteNode<T> {
    static_children: HashMap<String, RouteNode<T>>,
    /// Param slot plus the name the first registration gave it. A sibling
    /// pattern naming the same slot differently is rejected at build time.
    param_child: Option<(String, Box<RouteNode<T>>)>,
    wildcard_child: Option<Box<RouteNode<T>>>,
    entry: Option<RouteEntry<T>>,
}

impl<T> RouteNode<T> {
    fn new() -> Self {
        Self {
            static_children: HashMap::new(),
            param_child: None,
            wildcard_child: None,
            entry: None,
        }
    }
}

/// Terminal registration data attached where a full pattern ends.
/// Immutable once the trie is built; at most one per node.
pub struct RouteEntry<T> {
    pub pattern: String,
    /// Capture names in declaration order. The wildcard, if any, is recorded
    /// last under [`WILDCARD`].
    pub param_names: Vec<String>,
    methods: Vec<Method>,
    pub value: T,
}

/// A successful lookup: the entry plus captured values, positionally aligned
/// with `entry.param_names`.
pub struct Match<'t, T> {
    pub entry: &'t RouteEntry<T>,
    pub param_values: Vec<String>,
}

/// The route trie: build-time registration, lock-free shared lookup.
pub struct RouteTrie<T> {
    root: RouteNode<T>,
}

impl<T> RouteTrie<T> {
    pub fn new() -> Self {
        Self { root: RouteNode::new() }
    }

    /// Register `value` under `pattern` for the given methods.
    ///
    /// Fails fast on configuration bugs: a second entry on the same terminal
    /// node, a reused or conflicting `:name`, or a non-terminal `*`.
    pub fn register(
        &mut self,
        pattern: &str,
        methods: &[Method],
        value: T,
    ) -> Result<(), RouteError> {
        let fragments: Vec<&str> = pattern.split('/').collect();
        let mut param_names: Vec<String> = Vec::new();
        let mut node = &mut self.root;

        for (i, fragment) in fragments.iter().enumerate() {
            if let Some(name) = fragment.strip_prefix(':') {
                if name.is_empty() || param_names.iter().any(|n| n == name) {
                    return Err(RouteError::DuplicateParamName {
                        pattern: pattern.to_owned(),
                        name: name.to_owned(),
                    });
                }
                param_names.push(name.to_owned());
                let slot = node
                    .param_child
                    .get_or_insert_with(|| (name.to_owned(), Box::new(RouteNode::new())));
                if slot.0 != name {
                    return Err(RouteError::DuplicateParamName {
                        pattern: pattern.to_owned(),
                        name: name.to_owned(),
                    });
                }
                node = &mut *slot.1;
            } else if *fragment == WILDCARD {
                if i + 1 != fragments.len() {
                    return Err(RouteError::WildcardNotTerminal {
                        pattern: pattern.to_owned(),
                    });
                }
                param_names.push(WILDCARD.to_owned());
                node = &mut **node
                    .wildcard_child
                    .get_or_insert_with(|| Box::new(RouteNode::new()));
            } else {
                node = node
                    .static_children
                    .entry((*fragment).to_owned())
                    .or_insert_with(RouteNode::new);
            }
        }

        if node.entry.is_some() {
            return Err(RouteError::DuplicateRoute { pattern: pattern.to_owned() });
        }
        node.entry = Some(RouteEntry {
            pattern: pattern.to_owned(),
            param_names,
            methods: methods.to_vec(),
            value,
        });
        Ok(())
    }

    /// Look up `path` for `method`.
    ///
    /// Greedy descent, fragment by fragment: an exact static child wins, else
    /// the param slot captures the fragment, else the wildcard slot captures
    /// every remaining fragment joined by `/` and traversal stops. No
    /// backtracking — once a static child matches a fragment, sibling param
    /// and wildcard slots at that depth are never revisited.
    ///
    /// A method mismatch on an otherwise-matching path is a plain miss,
    /// indistinguishable from a path miss.
    pub fn at(&self, path: &str, method: &Method) -> Option<Match<'_, T>> {
        let fragments: Vec<&str> = path.split('/').collect();
        let mut param_values: Vec<String> = Vec::new();
        let mut node = &self.root;

        let mut i = 0;
        while i < fragments.len() {
            let fragment = fragments[i];
            if let Some(child) = node.static_children.get(fragment) {
                node = child;
            } else if let Some((_, child)) = &node.param_child {
                param_values.push(fragment.to_owned());
                node = &**child;
            } else if let Some(child) = &node.wildcard_child {
                param_values.push(fragments[i..].join("/"));
                node = &**child;
                break;
            } else {
                return None;
            }
            i += 1;
        }

        let entry = node.entry.as_ref()?;
        if !entry.methods.contains(method) {
            return None;
        }
        Some(Match { entry, param_values })
    }
}

impl<T> Default for RouteTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

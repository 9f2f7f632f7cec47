//! Registry of page patterns and the path resolver over it.

use pagewire_core::RouteParams;
use tracing::warn;

use crate::error::RouteError;
use crate::pattern::RoutePattern;
use crate::query::{FetchDescriptor, PageQuery, QueryKind};

/// A path that matched a registered pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub descriptor: FetchDescriptor,
    pub params: RouteParams,
    pub query: PageQuery,
}

/// Ordered pattern → query registry. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct QueryRegistry {
    descriptors: Vec<FetchDescriptor>,
}

impl QueryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every [`QueryKind`] under its default pattern.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in QueryKind::ALL {
            // Default patterns are distinct and well-formed.
            if let Err(e) = registry.register(kind.default_pattern(), kind) {
                warn!(kind = %kind, error = %e, "skipping default query");
            }
        }
        registry
    }

    /// Register `pattern` for `kind`. Patterns must be unique up to
    /// placeholder names.
    pub fn register(&mut self, pattern: &str, kind: QueryKind) -> Result<(), RouteError> {
        let pattern = RoutePattern::parse(pattern)?;
        if self.descriptors.iter().any(|d| d.pattern.same_shape(&pattern)) {
            return Err(RouteError::DuplicatePattern(pattern.as_str().to_string()));
        }
        self.descriptors.push(FetchDescriptor::new(pattern, kind)?);
        Ok(())
    }

    /// Builder form of [`QueryRegistry::register`].
    pub fn with_route(mut self, pattern: &str, kind: QueryKind) -> Result<Self, RouteError> {
        self.register(pattern, kind)?;
        Ok(self)
    }

    pub fn descriptors(&self) -> &[FetchDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Resolve a path. The first matching pattern, in registration order, wins.
    pub fn resolve(&self, path: &str) -> Option<Resolved> {
        for descriptor in &self.descriptors {
            let Some(params) = descriptor.pattern.matches(path) else {
                continue;
            };
            match descriptor.query(&params) {
                Ok(query) => {
                    return Some(Resolved {
                        descriptor: descriptor.clone(),
                        params,
                        query,
                    })
                }
                Err(e) => warn!(path, pattern = %descriptor.pattern, error = %e, "matched pattern without a query"),
            }
        }
        None
    }
}

//! Route → page-query resolution.
//!
//! Both the server renderer and the client navigator resolve a URL path the
//! same way, so they agree on which request to make and which cache key holds
//! the result:
//!
//! ```text
//! /users/7  --resolve-->  PageQuery::UserProfile { id: "7" }
//!                           ├── cache key   ["user","7"]
//!                           └── request     GET /api/users/7
//! ```
//!
//! # Usage
//!
//! ```rust
//! use pagewire_query::QueryRegistry;
//!
//! let registry = QueryRegistry::with_defaults();
//! let resolved = registry.resolve("/users/7").unwrap();
//! assert_eq!(resolved.query.cache_key().serialized(), r#"["user","7"]"#);
//! assert!(registry.resolve("/about").is_none());
//! ```

mod client;
mod error;
mod pattern;
mod query;
mod registry;

pub use client::*;
pub use error::*;
pub use pattern::*;
pub use query::*;
pub use registry::*;

//! In-memory TTL data cache shared by the HTTP client, the renderer and the
//! navigator.
//!
//! This crate provides:
//! - `CacheKey` - Ordered tuple of strings with structural equality
//! - `DataCache` - Keyed store with lazy TTL expiry and invalidation
//! - `CacheSnapshot` - Transferable form of a cache, safe to embed in HTML
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use pagewire_cache::{cache_key, DataCache};
//!
//! let cache: DataCache<String> = DataCache::new();
//! cache.set(cache_key!("user", 7), "Ada".to_string(), Duration::from_secs(60));
//!
//! assert_eq!(cache.get(&cache_key!("user", "7")), Some("Ada".to_string()));
//! ```

mod error;
mod key;
mod snapshot;
mod store;

pub use error::*;
pub use key::*;
pub use snapshot::*;
pub use store::*;

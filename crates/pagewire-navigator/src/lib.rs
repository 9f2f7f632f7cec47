//! Optimistic client-side navigation.
//!
//! A click on a link never waits on data for longer than a deadline:
//!
//! - unknown path, or data already cached: navigate immediately
//! - otherwise: race the page fetch against the deadline, then navigate
//!
//! A fetch that loses the race keeps running and fills the page cache, so the
//! page renders from cache once it lands. Hovering a link prefetches its data
//! after a short debounce.

mod config;
mod hover;
mod navigator;

pub use config::*;
pub use navigator::*;

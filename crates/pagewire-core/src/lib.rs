//! Shared types for the pagewire data resolution core.
//!
//! This crate provides:
//! - `RequestId` - Per-request trace identifier
//! - `RouteParams` - Placeholder bindings extracted from a path
//! - `PageData` - The page payload the pipeline produces and caches

mod context;
mod page;

pub use context::*;
pub use page::*;

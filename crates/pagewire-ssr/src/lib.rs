//! Server rendering with cache hydration.
//!
//! For each page request the server loads the page data through the
//! backend-for-frontend, seeds a request-scoped page cache with it, renders
//! the document from that cache and embeds a snapshot of the cache. The client
//! restores the snapshot ([`bootstrap_cache`]) before navigating, so the first
//! render needs no network round-trip.
//!
//! ```rust,no_run
//! use pagewire_ssr::{serve, AppConfig};
//!
//! # async fn run() -> Result<(), pagewire_ssr::SsrError> {
//! let config = AppConfig::default().with_bind("127.0.0.1:3000");
//! serve(&config, None).await
//! # }
//! ```

mod app;
mod bff;
mod bootstrap;
mod config;
mod dev;
mod error;
mod hydration;
mod render;
mod server;

pub use app::*;
pub use bff::*;
pub use bootstrap::*;
pub use config::*;
pub use dev::*;
pub use error::*;
pub use hydration::*;
pub use render::*;
pub use server::*;

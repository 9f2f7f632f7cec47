//! Observability setup for pagewire services.
//!
//! Installs a `tracing` subscriber with an `EnvFilter` and either JSON
//! (production) or human-readable (development) output.

mod logging;

pub use logging::*;

//! Hover prefetch with a debounce.

use std::sync::Arc;

use tracing::debug;

use crate::navigator::{lock, OptimisticNavigator};

impl OptimisticNavigator {
    /// The pointer entered a link to `path`: prefetch its data after the
    /// prefetch delay unless the pointer leaves first.
    ///
    /// Re-entering restarts the delay.
    pub fn pointer_enter(&self, path: &str) {
        let registry = Arc::clone(&self.registry);
        let client = Arc::clone(&self.client);
        let delay = self.config.prefetch_delay();
        let target = path.to_string();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(resolved) = registry.resolve(&target) else {
                return;
            };
            debug!(path = %target, key = %resolved.query.cache_key(), "hover prefetch");
            // Detached so a later pointer-leave cannot cancel a started fetch.
            tokio::spawn(async move { client.prefetch(&resolved.query).await });
        });

        let mut timers = lock(&self.hover_timers);
        timers.retain(|_, pending| !pending.is_finished());
        if let Some(previous) = timers.insert(path.to_string(), timer) {
            previous.abort();
        }
    }

    /// The pointer left a link to `path`: cancel a pending prefetch timer.
    pub fn pointer_leave(&self, path: &str) {
        if let Some(timer) = lock(&self.hover_timers).remove(path) {
            timer.abort();
        }
    }
}

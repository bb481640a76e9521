//! Built-in Rules — component D of the Warden pre-trade risk engine.
//!
//! A small, object-safe [`rule::Rule`] trait plus the two built-in rule
//! families named in spec §4.D: cumulative metric limits and rate limits
//! with automatic resume. The engine (component E) holds a hot-swappable
//! list of `Arc<dyn Rule>` and dispatches every event to each in turn.

pub mod context;
pub mod cumulative;
pub mod error;
pub mod rate_limit;
pub mod rule;

pub use context::{RuleContext, WindowRegistry};
pub use cumulative::CumulativeMetricLimit;
pub use error::{ConfigError, RuleError};
pub use rate_limit::{CountedEvent, RateLimit};
pub use rule::{ParamValue, Rule, RuleOutcome, RuleResult};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::context::WindowRegistry;
    use parking_lot::RwLock;
    use std::collections::HashMap;
    use std::sync::Arc;
    use warden_window::RollingWindowCounter;

    /// A [`WindowRegistry`] that panics if ever asked for a counter — for
    /// rule tests that never touch windowed state (e.g. `CumulativeMetricLimit`).
    pub struct NullWindowRegistry;

    impl WindowRegistry for NullWindowRegistry {
        fn get_or_create(&self, name: &str, _window_seconds: u32) -> Arc<RollingWindowCounter> {
            panic!("unexpected window registry access for {name:?} in a test that should not need one");
        }
    }

    /// A real, in-process [`WindowRegistry`] for rule tests that exercise
    /// [`RateLimit`](crate::rate_limit::RateLimit), without pulling in the
    /// full engine.
    #[derive(Default)]
    pub struct InMemoryWindowRegistry {
        windows: RwLock<HashMap<String, Arc<RollingWindowCounter>>>,
    }

    impl WindowRegistry for InMemoryWindowRegistry {
        fn get_or_create(&self, name: &str, window_seconds: u32) -> Arc<RollingWindowCounter> {
            if let Some(existing) = self.windows.read().get(name) {
                if existing.window_seconds() == window_seconds {
                    return Arc::clone(existing);
                }
            }
            let mut guard = self.windows.write();
            let counter = Arc::new(RollingWindowCounter::new(window_seconds, 4));
            guard.insert(name.to_string(), Arc::clone(&counter));
            counter
        }
    }
}

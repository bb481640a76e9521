use warden_model::Emitted;

/// The action sink contract (spec §6): a single callable invoked
/// synchronously for every emitted action, expected to enqueue-only and
/// return fast. Implementations must be thread-safe.
pub trait ActionSink: Send + Sync {
    fn handle(&self, emitted: &Emitted);
}

impl<F> ActionSink for F
where
    F: Fn(&Emitted) + Send + Sync,
{
    fn handle(&self, emitted: &Emitted) {
        self(emitted)
    }
}

/// A sink that discards everything. Useful as a builder default and in
/// tests that only care about `on_*`'s return value.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActionSink;

impl ActionSink for NullActionSink {
    fn handle(&self, _emitted: &Emitted) {}
}

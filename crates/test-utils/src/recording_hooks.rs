use std::sync::{Arc, Mutex};

use flowgate::dispatch::{HookEvent, NodeHooks};
use flowgate::engine::EngineFuture;
use flowgate::events::EngineEventName;

/// Hooks that record every event they receive.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    events: Arc<Mutex<Vec<HookEvent>>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `(event, node)` pairs in arrival order.
    pub fn names(&self) -> Vec<(EngineEventName, String)> {
        self.events()
            .into_iter()
            .map(|e| (e.event, e.node_id))
            .collect()
    }
}

impl NodeHooks for RecordingHooks {
    fn handle(&self, event: HookEvent) -> EngineFuture<'_, ()> {
        let events = Arc::clone(&self.events);
        Box::pin(async move {
            events.lock().unwrap().push(event);
            Ok(())
        })
    }
}

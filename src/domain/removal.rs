use crate::domain::models::ConfigHandle;
use std::collections::HashMap;

/// Maps an interface to the handle of its last accepted configuration.
/// Revoking needs the handle; the resolver does not take interface names.
/// Entries are only ever overwritten or cleared wholesale, a revoke keeps
/// the record so a later configuration for the same interface can still
/// replace it in place.
#[derive(Debug, Default)]
pub struct RemovalRegistry {
    handles: HashMap<Option<String>, ConfigHandle>,
}

impl RemovalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the handle for an interface, replacing any older one.
    /// `None` is the key for configurations built without an interface.
    pub fn record(&mut self, interface: Option<String>, handle: ConfigHandle) {
        self.handles.insert(interface, handle);
    }

    pub fn lookup(&self, interface: Option<&str>) -> Option<&ConfigHandle> {
        self.handles.get(&interface.map(str::to_owned))
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

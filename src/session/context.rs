//! Cross-message correlation state.
//!
//! The store is the only order-dependent state in the dissector. A request
//! decoder stashes one derived fact per in-flight call; the matching reply
//! decoder turns that fact into a label for the handle it produced; later
//! operations look the label up to annotate their own handle fields.
//!
//! One store per capture/session, single writer. Every operation is
//! last-write-wins so re-dissecting the same messages is harmless.

use std::collections::HashMap;

use log::{debug, warn};

use crate::protocol::codec::Handle;

/// A fact derived from a request, consumed by the matching reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fact {
    Rid(u32),
    Name(String),
    /// Handle referenced by a close-style request, so the reply knows
    /// which registration to drop.
    Handle(Handle),
}

/// Per-session correlation store: in-flight call scratch plus the
/// handle-to-label registry.
#[derive(Debug, Default)]
pub struct CallContextStore {
    scratch: HashMap<u64, Fact>,
    handles: HashMap<Handle, String>,
}

impl CallContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a request-derived fact for `call_id`, replacing any
    /// earlier one.
    pub fn stash(&mut self, call_id: u64, fact: Fact) {
        debug!("stash call_id={} fact={:?}", call_id, fact);
        self.scratch.insert(call_id, fact);
    }

    /// Fetch the fact stashed for `call_id`, if its request was observed.
    /// Non-destructive: re-dissection of the reply sees the same fact.
    pub fn take_label_source(&self, call_id: u64) -> Option<&Fact> {
        self.scratch.get(&call_id)
    }

    /// Bind a label to a newly produced handle. A collision with an
    /// unclosed handle is overwritten silently (the transport reused the
    /// token).
    pub fn register_handle(&mut self, handle: Handle, label: String) {
        if let Some(old) = self.handles.get(&handle) {
            if *old != label {
                warn!("handle {} relabeled (was {})", handle, old);
            }
        }
        self.handles.insert(handle, label);
    }

    pub fn lookup_handle_label(&self, handle: &Handle) -> Option<&str> {
        self.handles.get(handle).map(String::as_str)
    }

    /// Drop a handle's label once a close-style operation succeeds.
    pub fn forget_handle(&mut self, handle: &Handle) {
        self.handles.remove(handle);
    }

    /// Clear everything; called when a new capture is loaded.
    pub fn reset(&mut self) {
        self.scratch.clear();
        self.handles.clear();
    }

    /// Number of currently labeled handles.
    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::HANDLE_LEN;

    fn h(b: u8) -> Handle {
        Handle([b; HANDLE_LEN])
    }

    #[test]
    fn test_stash_is_last_write_wins() {
        let mut store = CallContextStore::new();
        store.stash(7, Fact::Rid(1));
        store.stash(7, Fact::Rid(2));
        assert_eq!(store.take_label_source(7), Some(&Fact::Rid(2)));
    }

    #[test]
    fn test_take_label_source_is_non_destructive() {
        let mut store = CallContextStore::new();
        store.stash(7, Fact::Name("x".into()));
        assert!(store.take_label_source(7).is_some());
        assert!(store.take_label_source(7).is_some());
    }

    #[test]
    fn test_missing_call_id_is_none() {
        let store = CallContextStore::new();
        assert_eq!(store.take_label_source(99), None);
    }

    #[test]
    fn test_handle_lifecycle() {
        let mut store = CallContextStore::new();
        store.register_handle(h(1), "X".into());
        assert_eq!(store.lookup_handle_label(&h(1)), Some("X"));

        store.forget_handle(&h(1));
        assert_eq!(store.lookup_handle_label(&h(1)), None);

        store.register_handle(h(2), "Y".into());
        store.stash(1, Fact::Rid(5));
        store.reset();
        assert_eq!(store.lookup_handle_label(&h(2)), None);
        assert_eq!(store.take_label_source(1), None);
        assert_eq!(store.live_handles(), 0);
    }

    #[test]
    fn test_collision_overwrites() {
        let mut store = CallContextStore::new();
        store.register_handle(h(1), "first".into());
        store.register_handle(h(1), "second".into());
        assert_eq!(store.lookup_handle_label(&h(1)), Some("second"));
    }
}

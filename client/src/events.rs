//! Callback dispatch: converts the decoder's change log into typed
//! add/remove/change notifications against application-registered
//! handlers.
//!
//! Handlers run synchronously, in change-deposit order, on the thread that
//! ran the decode. They are reentrant into application code but must not
//! trigger another decode pass against the same state.

use crate::{
    decode::change::{ChangeOp, ChangeRecord, FieldAddr},
    schema::field::RefId,
};

/// Stable handle for one registered handler; retain it to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Which notification stream a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Add,
    Remove,
    Change,
}

pub type ChangeHandler = Box<dyn FnMut(&ChangeRecord)>;

struct Subscription {
    id: SubscriptionId,
    target: RefId,
    kind: EventKind,
    /// For per-field subscriptions on record targets: only changes to this
    /// declared field index fire the handler.
    field: Option<u8>,
    handler: ChangeHandler,
}

/// Observer lists keyed by (instance, stream), invoked in registration
/// order for each change. Subscriptions are removed explicitly by handle;
/// nothing is cleaned up behind the caller's back.
pub struct CallbackRegistry {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 0,
        }
    }

    fn push(
        &mut self,
        target: RefId,
        kind: EventKind,
        field: Option<u8>,
        handler: ChangeHandler,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            target,
            kind,
            field,
            handler,
        });
        id
    }

    /// Notify when an entry is added to the collection `target`.
    pub fn on_add(&mut self, target: RefId, handler: ChangeHandler) -> SubscriptionId {
        self.push(target, EventKind::Add, None, handler)
    }

    /// Notify when an entry is removed from the collection `target`.
    pub fn on_remove(&mut self, target: RefId, handler: ChangeHandler) -> SubscriptionId {
        self.push(target, EventKind::Remove, None, handler)
    }

    /// Notify when an existing entry of the collection `target` changes.
    pub fn on_change(&mut self, target: RefId, handler: ChangeHandler) -> SubscriptionId {
        self.push(target, EventKind::Change, None, handler)
    }

    /// Notify when one declared field of the record `target` changes,
    /// including its first assignment.
    pub fn on_field_change(
        &mut self,
        target: RefId,
        field_index: u8,
        handler: ChangeHandler,
    ) -> SubscriptionId {
        self.push(target, EventKind::Change, Some(field_index), handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        self.subscriptions.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// Walk the change log in deposit order and invoke matching handlers.
    /// A DELETE_AND_ADD change fires remove handlers before add handlers.
    pub fn dispatch(&mut self, changes: &[ChangeRecord]) {
        for change in changes {
            match change.op {
                ChangeOp::Add => {
                    self.fire(change, EventKind::Add);
                    self.fire_field_watchers(change);
                }
                ChangeOp::Delete => self.fire(change, EventKind::Remove),
                ChangeOp::Replace => self.fire(change, EventKind::Change),
                ChangeOp::DeleteAndAdd => {
                    self.fire(change, EventKind::Remove);
                    self.fire(change, EventKind::Add);
                    self.fire_field_watchers(change);
                }
            }
        }
    }

    fn fire(&mut self, change: &ChangeRecord, kind: EventKind) {
        for sub in &mut self.subscriptions {
            if sub.target != change.ref_id || sub.kind != kind {
                continue;
            }
            if let Some(field_index) = sub.field {
                let matches = matches!(
                    &change.addr,
                    FieldAddr::Field { index, .. } if *index == field_index
                );
                if !matches {
                    continue;
                }
            }
            (sub.handler)(change);
        }
    }

    /// A record field's first assignment arrives as an ADD, not a REPLACE;
    /// per-field watchers observe it alongside later replacements.
    fn fire_field_watchers(&mut self, change: &ChangeRecord) {
        let FieldAddr::Field { index, .. } = &change.addr else {
            return;
        };
        for sub in &mut self.subscriptions {
            if sub.target == change.ref_id
                && sub.kind == EventKind::Change
                && sub.field == Some(*index)
            {
                (sub.handler)(change);
            }
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

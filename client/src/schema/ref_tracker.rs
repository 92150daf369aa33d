use std::collections::HashMap;

use log::warn;

use crate::schema::{field::RefId, instance::Instance};

struct Tracked {
    instance: Instance,
    ref_count: u32,
}

/// Registry mapping RefIds to live container instances, with reference
/// counting for collection.
///
/// The wire protocol freely aliases the same RefId into multiple parent
/// slots (instance sharing), so naive tree ownership breaks; an instance is
/// only purged once every parent slot referencing it has been removed.
/// Purging cascades: a purged instance decrements the counts of its own
/// children.
pub struct ReferenceTracker {
    instances: HashMap<RefId, Tracked>,
    next_id: RefId,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn contains(&self, ref_id: RefId) -> bool {
        self.instances.contains_key(&ref_id)
    }

    pub fn get(&self, ref_id: RefId) -> Option<&Instance> {
        self.instances.get(&ref_id).map(|tracked| &tracked.instance)
    }

    pub fn get_mut(&mut self, ref_id: RefId) -> Option<&mut Instance> {
        self.instances
            .get_mut(&ref_id)
            .map(|tracked| &mut tracked.instance)
    }

    pub fn ref_count(&self, ref_id: RefId) -> Option<u32> {
        self.instances.get(&ref_id).map(|tracked| tracked.ref_count)
    }

    /// Track a locally-created instance under the next free id, with one
    /// reference held by the caller.
    pub fn add(&mut self, instance: Instance) -> RefId {
        while self.instances.contains_key(&self.next_id) {
            self.next_id += 1;
        }
        let ref_id = self.next_id;
        self.next_id += 1;
        self.instances.insert(
            ref_id,
            Tracked {
                instance,
                ref_count: 1,
            },
        );
        ref_id
    }

    /// Track an instance under a server-assigned id, with one reference
    /// held by the parent slot whose ADD carried it.
    pub fn register(&mut self, ref_id: RefId, instance: Instance) {
        if self
            .instances
            .insert(
                ref_id,
                Tracked {
                    instance,
                    ref_count: 1,
                },
            )
            .is_some()
        {
            warn!("RefId {} re-registered while still tracked", ref_id);
        }
        if ref_id >= self.next_id {
            self.next_id = ref_id + 1;
        }
    }

    /// Record one more parent slot referencing `ref_id`.
    /// Returns false if the id is not tracked.
    pub fn add_ref(&mut self, ref_id: RefId) -> bool {
        match self.instances.get_mut(&ref_id) {
            Some(tracked) => {
                tracked.ref_count += 1;
                true
            }
            None => false,
        }
    }

    /// Drop one parent reference. When the count reaches zero the instance
    /// is physically deleted and the removal cascades into its children.
    pub fn remove(&mut self, ref_id: RefId) {
        let mut pending = vec![ref_id];
        while let Some(current) = pending.pop() {
            let Some(tracked) = self.instances.get_mut(&current) else {
                warn!("removal of untracked RefId {}", current);
                continue;
            };
            tracked.ref_count = tracked.ref_count.saturating_sub(1);
            if tracked.ref_count > 0 {
                continue;
            }
            let orphan = self
                .instances
                .remove(&current)
                .map(|tracked| tracked.instance);
            if let Some(instance) = orphan {
                pending.extend(instance.child_refs());
            }
        }
    }

    /// Full reset, e.g. on room teardown.
    pub fn clear(&mut self) {
        self.instances.clear();
        self.next_id = 0;
    }
}

impl Default for ReferenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

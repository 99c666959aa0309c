//! # SCR Core Component Registry
//!
//! Global bookkeeping of component names and ids.
//!
//! A name moves through two phases: a registration first *reserves* it,
//! then *binds* the finished holder in place of the reservation. The
//! reservation keeps a second registration of the same name out while the
//! first one validates its metadata and builds its holder outside the lock.
//!
//! The name map and the id map are guarded by independent locks. Neither is
//! ever held while holder code runs.
pub mod error;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::actor::ActorHandle;
use crate::holder::{ComponentHolder, HolderKind};
use crate::metadata::ComponentMetadata;
use crate::module::ModuleContext;

pub use error::{ConflictOwner, RegistryError};

/// Component identifier, allocated once and never reused
pub type ComponentId = u64;

enum NameSlot {
    Reserved,
    Bound(Arc<ComponentHolder>),
}

struct IdTable {
    next: ComponentId,
    holders: BTreeMap<ComponentId, Arc<ComponentHolder>>,
}

/// Name and id bookkeeping shared by every module of a runtime
pub struct ComponentRegistry {
    names: Mutex<BTreeMap<String, NameSlot>>,
    ids: Mutex<IdTable>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            names: Mutex::new(BTreeMap::new()),
            ids: Mutex::new(IdTable {
                next: 0,
                holders: BTreeMap::new(),
            }),
        }
    }

    /// Claim `name` for a registration in progress
    pub fn reserve_name(&self, name: &str) -> Result<(), RegistryError> {
        let mut names = lock(&self.names);
        match names.get(name) {
            None => {
                names.insert(name.to_string(), NameSlot::Reserved);
                Ok(())
            }
            Some(NameSlot::Reserved) => Err(RegistryError::NameConflict {
                name: name.to_string(),
                owner: None,
            }),
            Some(NameSlot::Bound(holder)) => Err(RegistryError::NameConflict {
                name: name.to_string(),
                owner: Some(ConflictOwner {
                    module: holder.module_info().to_string(),
                    implementation: holder.metadata().implementation.clone(),
                }),
            }),
        }
    }

    /// Build the holder variant matching `metadata`. Does not touch the registry maps.
    pub fn create_holder(
        self: &Arc<Self>,
        id: ComponentId,
        module: Arc<ModuleContext>,
        metadata: Arc<ComponentMetadata>,
        actor: ActorHandle,
    ) -> Arc<ComponentHolder> {
        let kind = match metadata.factory {
            Some(_) => HolderKind::Factory,
            None => HolderKind::Unconfigured,
        };
        ComponentHolder::new(id, metadata, kind, module, Arc::downgrade(self), actor)
    }

    /// Replace the reservation of `name` with `holder` and index it by id
    pub fn bind_holder(&self, name: &str, holder: Arc<ComponentHolder>) -> Result<(), RegistryError> {
        {
            let mut names = lock(&self.names);
            match names.get(name) {
                Some(NameSlot::Reserved) => {
                    names.insert(name.to_string(), NameSlot::Bound(holder.clone()));
                }
                Some(NameSlot::Bound(_)) => {
                    return Err(RegistryError::IllegalState {
                        name: name.to_string(),
                        message: "a holder is already bound to this name".to_string(),
                    });
                }
                None => {
                    return Err(RegistryError::IllegalState {
                        name: name.to_string(),
                        message: "the name has not been reserved".to_string(),
                    });
                }
            }
        }
        self.register_id(holder.id(), holder);
        Ok(())
    }

    /// Remove the slot of `name`, reservation or holder
    pub fn unbind(&self, name: &str) {
        lock(&self.names).remove(name);
    }

    /// Drop `holder` from both maps. The name slot is only removed while it
    /// still refers to this very holder.
    pub fn unregister_holder(&self, holder: &ComponentHolder) {
        {
            let mut names = lock(&self.names);
            let owned = matches!(
                names.get(holder.name()),
                Some(NameSlot::Bound(bound)) if std::ptr::eq(Arc::as_ptr(bound), holder)
            );
            if owned {
                names.remove(holder.name());
            }
        }
        self.release_id(holder.id());
    }

    /// Holder bound to `name`; reservations are not visible
    pub fn lookup(&self, name: &str) -> Option<Arc<ComponentHolder>> {
        match lock(&self.names).get(name) {
            Some(NameSlot::Bound(holder)) => Some(holder.clone()),
            _ => None,
        }
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        matches!(lock(&self.names).get(name), Some(NameSlot::Reserved))
    }

    pub fn allocate_id(&self) -> ComponentId {
        let mut ids = lock(&self.ids);
        let id = ids.next;
        ids.next += 1;
        id
    }

    pub fn register_id(&self, id: ComponentId, holder: Arc<ComponentHolder>) {
        lock(&self.ids).holders.insert(id, holder);
    }

    /// Forget the holder registered under `id`. The id itself is never handed out again.
    pub fn release_id(&self, id: ComponentId) {
        lock(&self.ids).holders.remove(&id);
    }

    /// Holder owning `id`; for a factory instance this is the factory holder
    pub fn holder_by_id(&self, id: ComponentId) -> Option<Arc<ComponentHolder>> {
        lock(&self.ids).holders.get(&id).cloned()
    }

    /// Stable copy of the bound holders matching `predicate`, ordered by id
    pub fn list_holders<F>(&self, predicate: F) -> Vec<Arc<ComponentHolder>>
    where
        F: Fn(&ComponentHolder) -> bool,
    {
        let mut holders: Vec<Arc<ComponentHolder>> = lock(&self.names)
            .values()
            .filter_map(|slot| match slot {
                NameSlot::Bound(holder) => Some(holder.clone()),
                NameSlot::Reserved => None,
            })
            .collect();
        holders.retain(|holder| predicate(holder));
        holders.sort_by_key(|holder| holder.id());
        holders
    }

    pub fn len(&self) -> usize {
        lock(&self.names)
            .values()
            .filter(|slot| matches!(slot, NameSlot::Bound(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.len())
            .field("next_id", &lock(&self.ids).next)
            .finish()
    }
}

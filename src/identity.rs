//! Application-wide identity store.
//!
//! Memoizes credential resolution so every guard mounted for the same session
//! reads one result instead of re-fetching. Concurrent lookups for a token share
//! a single in-flight resolution. Failures are never memoized: the next
//! navigation starts a fresh resolution.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::{auth::IdentityResolver, models::ResolvedIdentity};

struct Slot {
    created: Instant,
    resolved: OnceCell<Option<ResolvedIdentity>>,
}

/// IdentityStore
///
/// Shared, TTL-bounded cache in front of an `IdentityResolver`.
pub struct IdentityStore {
    resolver: Arc<dyn IdentityResolver>,
    ttl: Duration,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

/// IdentityState
///
/// The concrete type used to share the identity store across the application state.
pub type IdentityState = Arc<IdentityStore>;

impl IdentityStore {
    pub fn new(resolver: Arc<dyn IdentityResolver>, ttl: Duration) -> Self {
        Self {
            resolver,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// resolve
    ///
    /// Returns the identity behind `token`, or `None` when the credential is
    /// rejected or resolution fails for any reason.
    pub async fn resolve(&self, token: &str) -> Option<ResolvedIdentity> {
        let slot = self.slot_for(token);

        let resolved = slot
            .resolved
            .get_or_init(|| async {
                match self.resolver.resolve(token).await {
                    Ok(identity) => {
                        debug!(user_id = %identity.id, role = %identity.role, "identity resolved");
                        Some(identity)
                    }
                    Err(error) => {
                        warn!(%error, "identity resolution failed; treating caller as unauthenticated");
                        None
                    }
                }
            })
            .await
            .clone();

        if resolved.is_none() {
            self.evict(token, &slot);
        }

        resolved
    }

    /// Drops the memoized result for `token` (logout or credential rotation).
    pub fn invalidate(&self, token: &str) {
        if self.lock_slots().remove(token).is_some() {
            debug!("memoized identity invalidated");
        }
    }

    /// Number of live memoized sessions.
    pub fn cached_sessions(&self) -> usize {
        let now = Instant::now();
        self.lock_slots()
            .values()
            .filter(|slot| now.duration_since(slot.created) < self.ttl)
            .count()
    }

    fn slot_for(&self, token: &str) -> Arc<Slot> {
        let now = Instant::now();
        let mut slots = self.lock_slots();
        slots.retain(|_, slot| now.duration_since(slot.created) < self.ttl);

        slots
            .entry(token.to_string())
            .or_insert_with(|| {
                Arc::new(Slot {
                    created: now,
                    resolved: OnceCell::new(),
                })
            })
            .clone()
    }

    // Only removes the slot this caller resolved through; a newer slot for the
    // same token stays.
    fn evict(&self, token: &str, slot: &Arc<Slot>) {
        let mut slots = self.lock_slots();
        if slots
            .get(token)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            slots.remove(token);
        }
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

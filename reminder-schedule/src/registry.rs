use reminder_core::types::{CompiledTrigger, ReminderKind};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing;

type TriggerKey = (String, ReminderKind);

/// The live set of armed triggers. Keyed by `(user_id, kind)`, so arming
/// always replaces: two armed triggers can never share an identity.
///
/// Rebuilds construct the replacement map fully before swapping it in
/// under the write lock, so readers never observe a half-armed set and
/// there is no window with no triggers armed. Disarming only affects
/// future firings; dispatches already in flight run to completion.
#[derive(Clone, Default)]
pub struct TriggerRegistry {
    armed: Arc<RwLock<HashMap<TriggerKey, CompiledTrigger>>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a single trigger, replacing any armed trigger with the same
    /// `(user_id, kind)`.
    pub fn arm(&self, trigger: CompiledTrigger) {
        self.armed
            .write()
            .expect("trigger registry poisoned")
            .insert((trigger.user_id.clone(), trigger.kind), trigger);
    }

    /// Full reconciliation: replace the entire armed set in one swap.
    pub fn swap_all(&self, triggers: Vec<CompiledTrigger>) {
        let next: HashMap<TriggerKey, CompiledTrigger> = triggers
            .into_iter()
            .map(|t| ((t.user_id.clone(), t.kind), t))
            .collect();
        let count = next.len();
        *self.armed.write().expect("trigger registry poisoned") = next;
        tracing::debug!("Armed trigger set swapped, {} triggers live", count);
    }

    /// Kind-scoped reconciliation: replace every trigger of `kind`,
    /// leaving all other kinds untouched.
    pub fn swap_kind(&self, kind: ReminderKind, triggers: Vec<CompiledTrigger>) {
        let mut next: HashMap<TriggerKey, CompiledTrigger> = self
            .armed
            .read()
            .expect("trigger registry poisoned")
            .iter()
            .filter(|((_, k), _)| *k != kind)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for trigger in triggers {
            debug_assert_eq!(trigger.kind, kind);
            next.insert((trigger.user_id.clone(), trigger.kind), trigger);
        }
        *self.armed.write().expect("trigger registry poisoned") = next;
    }

    /// On-demand reconciliation for one user: drop all of their triggers
    /// and arm the given replacements.
    pub fn replace_user(&self, user_id: &str, triggers: Vec<CompiledTrigger>) {
        let mut armed = self.armed.write().expect("trigger registry poisoned");
        armed.retain(|(uid, _), _| uid != user_id);
        for trigger in triggers {
            armed.insert((trigger.user_id.clone(), trigger.kind), trigger);
        }
    }

    pub fn disarm_user(&self, user_id: &str) {
        self.replace_user(user_id, Vec::new());
    }

    /// Triggers firing at the given UTC wall-clock minute.
    pub fn due(&self, hour: u8, minute: u8) -> Vec<CompiledTrigger> {
        self.armed
            .read()
            .expect("trigger registry poisoned")
            .values()
            .filter(|t| t.schedule.fires_at(hour, minute))
            .cloned()
            .collect()
    }

    pub fn armed_count(&self) -> usize {
        self.armed.read().expect("trigger registry poisoned").len()
    }

    pub fn armed_for(&self, user_id: &str) -> Vec<CompiledTrigger> {
        self.armed
            .read()
            .expect("trigger registry poisoned")
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn kinds_for(&self, user_id: &str) -> Vec<ReminderKind> {
        let mut kinds: Vec<ReminderKind> = self
            .armed_for(user_id)
            .into_iter()
            .map(|t| t.kind)
            .collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

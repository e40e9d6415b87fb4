use crate::types::{DispatchRecord, DispatchResult, ReminderKind};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Last dispatch outcome per (user, reminder kind). A user who stops
/// receiving reminders is diagnosed through this book plus the endpoint
/// cache, via the status API.
#[derive(Clone, Default)]
pub struct StatusBook {
    inner: Arc<RwLock<HashMap<(String, ReminderKind), DispatchRecord>>>,
}

impl StatusBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, user_id: &str, kind: ReminderKind, result: DispatchResult) {
        self.inner.write().expect("status book poisoned").insert(
            (user_id.to_string(), kind),
            DispatchRecord {
                result,
                at: Utc::now(),
            },
        );
    }

    pub fn last(&self, user_id: &str, kind: ReminderKind) -> Option<DispatchRecord> {
        self.inner
            .read()
            .expect("status book poisoned")
            .get(&(user_id.to_string(), kind))
            .cloned()
    }

    pub fn for_user(&self, user_id: &str) -> Vec<(ReminderKind, DispatchRecord)> {
        let inner = self.inner.read().expect("status book poisoned");
        ReminderKind::ALL
            .iter()
            .filter_map(|&kind| {
                inner
                    .get(&(user_id.to_string(), kind))
                    .map(|record| (kind, record.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_replace_per_user_and_kind() {
        let book = StatusBook::new();
        book.record("u1", ReminderKind::Water, DispatchResult::Failure);
        book.record("u1", ReminderKind::Water, DispatchResult::Delivered);
        book.record("u1", ReminderKind::Sleep, DispatchResult::NoEndpoint);

        let last = book.last("u1", ReminderKind::Water).unwrap();
        assert_eq!(last.result, DispatchResult::Delivered);
        assert_eq!(book.for_user("u1").len(), 2);
        assert!(book.for_user("u2").is_empty());
    }
}

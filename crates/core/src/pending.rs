//! Unflushed local progress intent.
//!
//! [`PendingUpdates`] is a map from achievement id to the completion state
//! the user wants, not a queue of events: writing an id that is already
//! present overwrites it, so only the net intent per achievement is ever
//! sent to the backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AchievementId, Timestamp};

/// Prefix of the durable-store key holding a user's pending backup.
pub const PENDING_BACKUP_KEY_PREFIX: &str = "tidemark_pending:";

/// One entry of a batch update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub achievement_id: AchievementId,
    pub is_completed: bool,
}

/// Pending completion states keyed by achievement id (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingUpdates(BTreeMap<AchievementId, bool>);

impl PendingUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the target state for an achievement, returning the value it
    /// replaced, if any.
    pub fn set(&mut self, achievement_id: AchievementId, is_completed: bool) -> Option<bool> {
        self.0.insert(achievement_id, is_completed)
    }

    /// Record the inverse of `current_effective` and return the new state.
    pub fn toggle(&mut self, achievement_id: AchievementId, current_effective: bool) -> bool {
        let target = !current_effective;
        self.0.insert(achievement_id, target);
        target
    }

    pub fn get(&self, achievement_id: AchievementId) -> Option<bool> {
        self.0.get(&achievement_id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AchievementId, bool)> + '_ {
        self.0.iter().map(|(id, state)| (*id, *state))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Serialize the map into the batch request body, ordered by id.
    pub fn to_updates(&self) -> Vec<ProgressUpdate> {
        self.iter()
            .map(|(achievement_id, is_completed)| ProgressUpdate {
                achievement_id,
                is_completed,
            })
            .collect()
    }

    /// Drop every entry that still holds the value recorded in `sent`.
    ///
    /// Entries overwritten after `sent` was snapshotted keep their newer
    /// value. Returns the number of entries removed.
    pub fn acknowledge(&mut self, sent: &PendingUpdates) -> usize {
        let before = self.0.len();
        for (id, state) in sent.iter() {
            if self.0.get(&id) == Some(&state) {
                self.0.remove(&id);
            }
        }
        before - self.0.len()
    }
}

impl FromIterator<(AchievementId, bool)> for PendingUpdates {
    fn from_iter<I: IntoIterator<Item = (AchievementId, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Durable snapshot of a user's pending updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBackup {
    pub saved_at: Timestamp,
    pub updates: PendingUpdates,
}

impl PendingBackup {
    pub fn new(updates: PendingUpdates) -> Self {
        Self {
            saved_at: chrono::Utc::now(),
            updates,
        }
    }

    /// Store key of the backup slot for `nickname`.
    pub fn storage_key(nickname: &str) -> String {
        format!("{PENDING_BACKUP_KEY_PREFIX}{nickname}")
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

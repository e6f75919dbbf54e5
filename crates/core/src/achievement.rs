//! Achievement reference data, per-user progress, and the merged checklist
//! view derived from them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::pending::PendingUpdates;
use crate::types::{AchievementId, DbId};

// ---------------------------------------------------------------------------
// Reference data and progress rows
// ---------------------------------------------------------------------------

/// A hidden achievement as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub point: i32,
    #[serde(default)]
    pub discord_url: Option<String>,
    #[serde(default)]
    pub is_legacy: bool,
}

/// Stored completion state of one achievement for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub id: Option<DbId>,
    pub achievement_id: AchievementId,
    pub is_completed: bool,
}

/// Achievement joined with the user's stored progress and pending intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedAchievement {
    #[serde(flatten)]
    pub achievement: Achievement,
    /// Effective completion state: pending, else stored, else `false`.
    pub is_completed: bool,
    /// Id of the stored progress row, if one exists.
    pub progress_id: Option<DbId>,
    /// Whether `is_completed` comes from an unflushed local change.
    pub is_pending: bool,
}

/// Join achievements with stored progress and overlay pending updates.
///
/// Output order follows `achievements`. Pending entries for ids that are not
/// in `achievements` are ignored.
pub fn merge(
    achievements: &[Achievement],
    progress: &[ProgressRecord],
    pending: &PendingUpdates,
) -> Vec<MergedAchievement> {
    let stored: HashMap<AchievementId, &ProgressRecord> = progress
        .iter()
        .map(|record| (record.achievement_id, record))
        .collect();

    achievements
        .iter()
        .map(|achievement| {
            let record = stored.get(&achievement.id);
            let stored_state = record.map(|r| r.is_completed).unwrap_or(false);
            let pending_state = pending.get(achievement.id);
            MergedAchievement {
                achievement: achievement.clone(),
                is_completed: pending_state.unwrap_or(stored_state),
                progress_id: record.and_then(|r| r.id),
                is_pending: pending_state.is_some(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Filtering and search
// ---------------------------------------------------------------------------

/// Completion filter offered by the checklist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistFilter {
    #[default]
    All,
    Completed,
    Incomplete,
}

impl ChecklistFilter {
    fn accepts(self, item: &MergedAchievement) -> bool {
        match self {
            Self::All => true,
            Self::Completed => item.is_completed,
            Self::Incomplete => !item.is_completed,
        }
    }
}

/// Apply a completion filter and a case-insensitive search term.
///
/// The term matches against both `name` and `content`; an empty or
/// whitespace-only term matches everything.
pub fn filter_view<'a>(
    view: &'a [MergedAchievement],
    filter: ChecklistFilter,
    term: &str,
) -> Vec<&'a MergedAchievement> {
    let term = term.trim().to_lowercase();
    view.iter()
        .filter(|item| filter.accepts(item))
        .filter(|item| {
            term.is_empty()
                || item.achievement.name.to_lowercase().contains(&term)
                || item.achievement.content.to_lowercase().contains(&term)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Progress totals for the active (non-legacy) achievements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub completed: usize,
    pub total: usize,
    /// Rounded percentage, `0` when there are no active achievements.
    pub completion_rate: u32,
    pub earned_points: i64,
    pub total_points: i64,
}

impl ProgressSummary {
    pub fn from_view(view: &[MergedAchievement]) -> Self {
        let active = view.iter().filter(|item| !item.achievement.is_legacy);

        let mut completed = 0;
        let mut total = 0;
        let mut earned_points = 0i64;
        let mut total_points = 0i64;
        for item in active {
            total += 1;
            total_points += i64::from(item.achievement.point);
            if item.is_completed {
                completed += 1;
                earned_points += i64::from(item.achievement.point);
            }
        }

        let completion_rate = if total > 0 {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };

        Self {
            completed,
            total,
            completion_rate,
            earned_points,
            total_points,
        }
    }
}

// ---------------------------------------------------------------------------
// Admin payloads
// ---------------------------------------------------------------------------

/// Default point value for newly created achievements.
pub const DEFAULT_ACHIEVEMENT_POINT: i32 = 20;

/// Body of an admin "create achievement" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDraft {
    pub name: String,
    pub content: String,
    pub point: i32,
    pub discord_url: Option<String>,
    pub is_legacy: bool,
}

impl AchievementDraft {
    /// Trim text fields, turn a blank Discord URL into `None`, and reject
    /// empty names/contents or negative points.
    pub fn normalized(self) -> Result<Self, CoreError> {
        let name = self.name.trim().to_string();
        let content = self.content.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::Validation("Achievement name is required".into()));
        }
        if content.is_empty() {
            return Err(CoreError::Validation(
                "Achievement content is required".into(),
            ));
        }
        if self.point < 0 {
            return Err(CoreError::Validation(format!(
                "Achievement point must not be negative, got {}",
                self.point
            )));
        }
        Ok(Self {
            name,
            content,
            point: self.point,
            discord_url: normalize_url(self.discord_url),
            is_legacy: self.is_legacy,
        })
    }
}

/// Body of an admin "update achievement" request. Absent fields are left
/// untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<i32>,
    /// `Some(None)` clears the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_legacy: Option<bool>,
}

impl AchievementPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn normalize_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn achievement(id: AchievementId, name: &str, point: i32, is_legacy: bool) -> Achievement {
        Achievement {
            id,
            name: name.to_string(),
            content: format!("{name} content"),
            point,
            discord_url: None,
            is_legacy,
        }
    }

    fn record(id: DbId, achievement_id: AchievementId, is_completed: bool) -> ProgressRecord {
        ProgressRecord {
            id: Some(id),
            achievement_id,
            is_completed,
        }
    }

    // -- merge --

    #[test]
    fn merge_defaults_to_incomplete_without_records() {
        let achievements = vec![achievement(1, "First", 20, false), achievement(2, "Second", 20, false)];
        let view = merge(&achievements, &[], &PendingUpdates::new());
        assert_eq!(view.len(), 2);
        assert!(view.iter().all(|item| !item.is_completed));
        assert!(view.iter().all(|item| item.progress_id.is_none()));
    }

    #[test]
    fn merge_uses_stored_state() {
        let achievements = vec![achievement(1, "First", 20, false)];
        let view = merge(&achievements, &[record(77, 1, true)], &PendingUpdates::new());
        assert!(view[0].is_completed);
        assert_eq!(view[0].progress_id, Some(77));
        assert!(!view[0].is_pending);
    }

    #[test]
    fn pending_overrides_stored_state() {
        let achievements = vec![achievement(1, "First", 20, false)];
        let mut pending = PendingUpdates::new();
        pending.set(1, false);

        let view = merge(&achievements, &[record(77, 1, true)], &pending);
        assert!(!view[0].is_completed);
        assert!(view[0].is_pending);
        assert_eq!(view[0].progress_id, Some(77));
    }

    #[test]
    fn merge_preserves_achievement_order_and_ignores_unknown_pending() {
        let achievements = vec![achievement(3, "C", 20, false), achievement(1, "A", 20, false)];
        let pending: PendingUpdates = [(99, true)].into_iter().collect();
        let view = merge(&achievements, &[], &pending);
        let ids: Vec<_> = view.iter().map(|m| m.achievement.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn merge_is_value_stable() {
        let achievements = vec![achievement(1, "A", 20, false), achievement(2, "B", 10, true)];
        let records = vec![record(5, 2, true)];
        let pending: PendingUpdates = [(1, true)].into_iter().collect();
        assert_eq!(
            merge(&achievements, &records, &pending),
            merge(&achievements, &records, &pending)
        );
    }

    // -- filter_view --

    #[test]
    fn filter_by_completion() {
        let achievements = vec![achievement(1, "A", 20, false), achievement(2, "B", 20, false)];
        let view = merge(&achievements, &[record(1, 2, true)], &PendingUpdates::new());

        let done = filter_view(&view, ChecklistFilter::Completed, "");
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].achievement.id, 2);

        let open = filter_view(&view, ChecklistFilter::Incomplete, "");
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].achievement.id, 1);

        assert_eq!(filter_view(&view, ChecklistFilter::All, "").len(), 2);
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_content() {
        let mut lighthouse = achievement(1, "Lighthouse Keeper", 20, false);
        lighthouse.content = "Visit every beacon".into();
        let view = merge(
            &[lighthouse, achievement(2, "Deep Dive", 20, false)],
            &[],
            &PendingUpdates::new(),
        );

        assert_eq!(filter_view(&view, ChecklistFilter::All, "lighthouse").len(), 1);
        assert_eq!(filter_view(&view, ChecklistFilter::All, "BEACON").len(), 1);
        assert_eq!(filter_view(&view, ChecklistFilter::All, "  ").len(), 2);
        assert!(filter_view(&view, ChecklistFilter::All, "kraken").is_empty());
    }

    // -- ProgressSummary --

    #[test]
    fn summary_excludes_legacy_achievements() {
        let achievements = vec![
            achievement(1, "A", 20, false),
            achievement(2, "B", 30, false),
            achievement(3, "Old", 50, true),
        ];
        let records = vec![record(1, 1, true), record(2, 3, true)];
        let view = merge(&achievements, &records, &PendingUpdates::new());

        let summary = ProgressSummary::from_view(&view);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.completion_rate, 50);
        assert_eq!(summary.earned_points, 20);
        assert_eq!(summary.total_points, 50);
    }

    #[test]
    fn summary_of_empty_view_is_zero() {
        let summary = ProgressSummary::from_view(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.completion_rate, 0);
    }

    #[test]
    fn completion_rate_rounds() {
        let achievements: Vec<_> = (1..=3).map(|id| achievement(id, "X", 1, false)).collect();
        let view = merge(&achievements, &[record(1, 1, true)], &PendingUpdates::new());
        assert_eq!(ProgressSummary::from_view(&view).completion_rate, 33);
    }

    // -- AchievementDraft --

    #[test]
    fn draft_normalization_trims_and_clears_blank_url() {
        let draft = AchievementDraft {
            name: "  Storm Chaser ".into(),
            content: " Sail through a storm ".into(),
            point: DEFAULT_ACHIEVEMENT_POINT,
            discord_url: Some("   ".into()),
            is_legacy: false,
        }
        .normalized()
        .unwrap();
        assert_eq!(draft.name, "Storm Chaser");
        assert_eq!(draft.content, "Sail through a storm");
        assert_eq!(draft.discord_url, None);
    }

    #[test]
    fn draft_rejects_missing_name_and_negative_points() {
        let base = AchievementDraft {
            name: String::new(),
            content: "c".into(),
            point: 0,
            discord_url: None,
            is_legacy: false,
        };
        assert!(base.clone().normalized().is_err());

        let negative = AchievementDraft {
            name: "n".into(),
            point: -1,
            ..base
        };
        assert!(matches!(negative.normalized(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn patch_skips_absent_fields() {
        let patch = AchievementPatch {
            point: Some(0),
            discord_url: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "point": 0, "discord_url": null }));
        assert!(AchievementPatch::default().is_empty());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Outcome, PayloadRange, Selection, SessionId, SiteSelection, SliderBounds},
    error::ApiError,
};

/// Input event for a dashboard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SelectionChange {
    Site { site: SiteSelection },
    PayloadRange { low: f64, high: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSlice {
    pub outcome: Outcome,
    pub count: usize,
}

/// Pie chart data. Outcomes with no records have no slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeProportions {
    pub title: String,
    pub slices: Vec<OutcomeSlice>,
}

impl OutcomeProportions {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.slices
            .iter()
            .find(|slice| slice.outcome == outcome)
            .map_or(0, |slice| slice.count)
    }

    pub fn total(&self) -> usize {
        self.slices.iter().map(|slice| slice.count).sum()
    }

    pub fn success_ratio(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(self.count(Outcome::Success) as f64 / total as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub payload_mass_kg: f64,
    pub outcome: Outcome,
    pub booster_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterProjection {
    pub title: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub selection: Selection,
    pub revision: u64,
    pub outcomes: OutcomeProportions,
    pub scatter: ScatterProjection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderMark {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardLayout {
    pub title: String,
    pub site_options: Vec<SiteOption>,
    pub slider: SliderBounds,
    pub slider_marks: Vec<SliderMark>,
    pub initial_selection: Selection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_payload: Option<PayloadRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOpened {
    pub session_id: SessionId,
    pub opened_at: DateTime<Utc>,
    pub view: DashboardView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum DashboardEvent {
    ViewUpdated {
        session_id: SessionId,
        view: DashboardView,
    },
    SessionClosed {
        session_id: SessionId,
    },
    Error(ApiError),
}

impl DashboardEvent {
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            DashboardEvent::ViewUpdated { session_id, .. }
            | DashboardEvent::SessionClosed { session_id } => Some(*session_id),
            DashboardEvent::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_change_uses_tagged_payload() {
        let change: SelectionChange = serde_json::from_value(serde_json::json!({
            "type": "payload_range",
            "payload": { "low": 0.0, "high": 2500.0 }
        }))
        .expect("json");
        assert_eq!(
            change,
            SelectionChange::PayloadRange {
                low: 0.0,
                high: 2500.0
            }
        );

        let change: SelectionChange = serde_json::from_value(serde_json::json!({
            "type": "site",
            "payload": { "site": "ALL" }
        }))
        .expect("json");
        assert_eq!(
            change,
            SelectionChange::Site {
                site: SiteSelection::All
            }
        );
    }

    #[test]
    fn proportions_report_missing_outcomes_as_zero() {
        let proportions = OutcomeProportions {
            title: "t".into(),
            slices: vec![OutcomeSlice {
                outcome: Outcome::Success,
                count: 3,
            }],
        };
        assert_eq!(proportions.count(Outcome::Failure), 0);
        assert_eq!(proportions.total(), 3);
        assert_eq!(proportions.success_ratio(), Some(1.0));

        let empty = OutcomeProportions {
            title: "t".into(),
            slices: Vec::new(),
        };
        assert_eq!(empty.success_ratio(), None);
    }
}

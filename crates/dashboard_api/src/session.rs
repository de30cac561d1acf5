//! Per-user selection state and the recompute-on-change contract.
//!
//! A session owns one [`Selection`]. Every accepted [`SelectionUpdate`]
//! replaces one field of it, recomputes both projections from the shared
//! dataset and hands the new view to the registered observers. Views never
//! write back into the selection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dataset::Dataset;
use shared::{
    domain::{PayloadRange, Selection, SessionId, SiteSelection, SliderBounds},
    protocol::DashboardView,
};
use tracing::{debug, info};

use crate::{build_view, initial_selection};

/// A selection change that already passed input validation.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionUpdate {
    Site(SiteSelection),
    PayloadRange(PayloadRange),
}

pub trait ViewObserver: Send + Sync {
    fn view_updated(&self, session_id: SessionId, view: &DashboardView);
}

pub struct DashboardSession {
    id: SessionId,
    opened_at: DateTime<Utc>,
    dataset: Arc<Dataset>,
    initial: Selection,
    selection: Selection,
    revision: u64,
    view: DashboardView,
    observers: Vec<Arc<dyn ViewObserver>>,
}

impl DashboardSession {
    pub fn open(dataset: Arc<Dataset>, slider: &SliderBounds) -> Self {
        Self::open_with_id(SessionId::new(), dataset, slider)
    }

    pub fn open_with_id(id: SessionId, dataset: Arc<Dataset>, slider: &SliderBounds) -> Self {
        let initial = initial_selection(&dataset, slider);
        let view = build_view(&dataset, &initial, 0);
        Self {
            id,
            opened_at: Utc::now(),
            dataset,
            selection: initial.clone(),
            initial,
            revision: 0,
            view,
            observers: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn subscribe(&mut self, observer: Arc<dyn ViewObserver>) {
        self.observers.push(observer);
    }

    pub fn apply(&mut self, update: SelectionUpdate) -> &DashboardView {
        match update {
            SelectionUpdate::Site(site) => {
                if let SiteSelection::Site(name) = &site {
                    if !self.dataset.is_known_site(name) {
                        debug!(session_id = %self.id, site = %name, "selected site is not in the dataset");
                    }
                }
                self.selection.site = site;
            }
            SelectionUpdate::PayloadRange(range) => {
                self.selection.payload_range = range;
            }
        }
        self.recompute()
    }

    /// Returns to the selection the session was opened with.
    pub fn reset(&mut self) -> &DashboardView {
        self.selection = self.initial.clone();
        self.recompute()
    }

    fn recompute(&mut self) -> &DashboardView {
        self.revision += 1;
        self.view = build_view(&self.dataset, &self.selection, self.revision);
        info!(
            session_id = %self.id,
            revision = self.revision,
            site = %self.selection.site,
            low = self.selection.payload_range.low(),
            high = self.selection.payload_range.high(),
            matched = self.view.scatter.points.len(),
            "recomputed dashboard view"
        );
        for observer in &self.observers {
            observer.view_updated(self.id, &self.view);
        }
        &self.view
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

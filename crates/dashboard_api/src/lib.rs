use std::sync::Arc;

use dataset::Dataset;
use shared::{
    domain::{PayloadRange, RangeError, Selection, SiteSelection, SliderBounds, ALL_SITES},
    error::ApiError,
    protocol::{DashboardLayout, DashboardView, SelectionChange, SiteOption, SliderMark},
};

pub mod filter;
pub mod projection;
pub mod session;

pub use filter::filter;
pub use projection::{project_outcomes, project_scatter};
pub use session::{DashboardSession, SelectionUpdate, ViewObserver};

pub const DASHBOARD_TITLE: &str = "SpaceX Launch Records Dashboard";

#[derive(Clone)]
pub struct ApiContext {
    pub dataset: Arc<Dataset>,
    pub slider: SliderBounds,
}

impl ApiContext {
    pub fn open_session(&self) -> DashboardSession {
        DashboardSession::open(Arc::clone(&self.dataset), &self.slider)
    }

    /// Interval accepted for payload ranges: the slider bound, widened to
    /// cover the observed payload extent.
    pub fn input_bound(&self) -> PayloadRange {
        let slider = self.slider.range();
        match self.dataset.payload_extent() {
            Some(extent) if !extent.is_within(&slider) => PayloadRange::new(
                slider.low().min(extent.low()),
                slider.high().max(extent.high()),
            )
            .unwrap_or(slider),
            _ => slider,
        }
    }
}

/// `ALL` plus the observed payload extent, or the whole slider when no record
/// has a known mass.
pub fn initial_selection(dataset: &Dataset, slider: &SliderBounds) -> Selection {
    Selection {
        site: SiteSelection::All,
        payload_range: dataset.payload_extent().unwrap_or_else(|| slider.range()),
    }
}

pub fn site_options(dataset: &Dataset) -> Vec<SiteOption> {
    std::iter::once(SiteOption {
        label: "All Sites".to_string(),
        value: ALL_SITES.to_string(),
    })
    .chain(dataset.sites().iter().map(|site| SiteOption {
        label: site.clone(),
        value: site.clone(),
    }))
    .collect()
}

pub fn dashboard_layout(ctx: &ApiContext) -> DashboardLayout {
    DashboardLayout {
        title: DASHBOARD_TITLE.to_string(),
        site_options: site_options(&ctx.dataset),
        slider: ctx.slider.clone(),
        slider_marks: ctx
            .slider
            .marks()
            .into_iter()
            .map(|(value, label)| SliderMark { value, label })
            .collect(),
        initial_selection: initial_selection(&ctx.dataset, &ctx.slider),
        observed_payload: ctx.dataset.payload_extent(),
    }
}

/// Filters once and derives both chart projections from the same subset.
pub fn build_view(dataset: &Dataset, selection: &Selection, revision: u64) -> DashboardView {
    let subset = filter(dataset.records(), &selection.site, &selection.payload_range);
    DashboardView {
        selection: selection.clone(),
        revision,
        outcomes: project_outcomes(&subset, &selection.site),
        scatter: project_scatter(&subset, &selection.site),
    }
}

pub fn validate_range(ctx: &ApiContext, low: f64, high: f64) -> Result<PayloadRange, ApiError> {
    let range = PayloadRange::new(low, high).map_err(|err| ApiError::validation(err.to_string()))?;
    let bound = ctx.input_bound();
    if !range.is_within(&bound) {
        let err = RangeError::OutOfBounds {
            low,
            high,
            min: bound.low(),
            max: bound.high(),
        };
        return Err(ApiError::validation(err.to_string()));
    }
    Ok(range)
}

/// Input boundary for selection events. Ranges are checked here; site names
/// are passed through untouched.
pub fn validate_change(
    ctx: &ApiContext,
    change: SelectionChange,
) -> Result<SelectionUpdate, ApiError> {
    match change {
        SelectionChange::Site { site } => Ok(SelectionUpdate::Site(site)),
        SelectionChange::PayloadRange { low, high } => {
            validate_range(ctx, low, high).map(SelectionUpdate::PayloadRange)
        }
    }
}

/// View for an ad-hoc selection without opening a session. Missing bounds
/// default to the initial selection's.
pub fn stateless_view(
    ctx: &ApiContext,
    site: Option<SiteSelection>,
    low: Option<f64>,
    high: Option<f64>,
) -> Result<DashboardView, ApiError> {
    let initial = initial_selection(&ctx.dataset, &ctx.slider);
    let low = low.unwrap_or(initial.payload_range.low());
    let high = high.unwrap_or(initial.payload_range.high());
    let selection = Selection {
        site: site.unwrap_or(initial.site),
        payload_range: validate_range(ctx, low, high)?,
    };
    Ok(build_view(&ctx.dataset, &selection, 0))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

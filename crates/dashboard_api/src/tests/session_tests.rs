use std::sync::Mutex;

use super::*;
use shared::domain::{LaunchRecord, Outcome};

fn record(site: &str, mass: Option<f64>, outcome: Outcome) -> LaunchRecord {
    LaunchRecord {
        flight_number: None,
        site: site.into(),
        payload_mass_kg: mass,
        outcome,
        booster_version: None,
        booster_category: "FT".into(),
    }
}

fn dataset() -> Arc<Dataset> {
    Arc::new(
        Dataset::from_records(vec![
            record("A", Some(500.0), Outcome::Success),
            record("A", Some(9000.0), Outcome::Failure),
            record("B", Some(3000.0), Outcome::Success),
            record("B", None, Outcome::Failure),
        ])
        .expect("dataset"),
    )
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(SessionId, u64)>>,
}

impl ViewObserver for Recorder {
    fn view_updated(&self, session_id: SessionId, view: &DashboardView) {
        self.seen
            .lock()
            .expect("lock")
            .push((session_id, view.revision));
    }
}

#[test]
fn opens_with_all_sites_and_observed_extent() {
    let session = DashboardSession::open(dataset(), &SliderBounds::default());
    assert_eq!(session.selection().site, SiteSelection::All);
    assert_eq!(session.selection().payload_range.low(), 500.0);
    assert_eq!(session.selection().payload_range.high(), 9000.0);
    assert_eq!(session.revision(), 0);
    assert_eq!(session.view().scatter.points.len(), 3);
    assert_eq!(session.view().outcomes.total(), 3);
}

#[test]
fn every_change_recomputes_both_views() {
    let mut session = DashboardSession::open(dataset(), &SliderBounds::default());

    let view = session
        .apply(SelectionUpdate::Site(SiteSelection::from("A")))
        .clone();
    assert_eq!(view.revision, 1);
    assert_eq!(view.outcomes.title, "Success vs. Failure for A");
    assert_eq!(view.scatter.title, "Payload Mass vs. Launch Success (A)");
    assert_eq!(view.outcomes.total(), 2);
    assert_eq!(view.scatter.points.len(), 2);

    let range = PayloadRange::new(0.0, 1000.0).expect("range");
    let view = session.apply(SelectionUpdate::PayloadRange(range)).clone();
    assert_eq!(view.revision, 2);
    assert_eq!(view.selection.site, SiteSelection::from("A"));
    assert_eq!(view.outcomes.total(), 1);
    assert_eq!(view.outcomes.count(Outcome::Success), 1);
    assert_eq!(view.scatter.points.len(), 1);
}

#[test]
fn unknown_site_gives_empty_view_without_error() {
    let mut session = DashboardSession::open(dataset(), &SliderBounds::default());
    let view = session.apply(SelectionUpdate::Site(SiteSelection::from("C")));
    assert!(view.outcomes.slices.is_empty());
    assert!(view.scatter.points.is_empty());
}

#[test]
fn reset_restores_initial_selection() {
    let mut session = DashboardSession::open(dataset(), &SliderBounds::default());
    let initial = session.selection().clone();
    session.apply(SelectionUpdate::Site(SiteSelection::from("B")));
    session.apply(SelectionUpdate::PayloadRange(
        PayloadRange::new(100.0, 200.0).expect("range"),
    ));

    let view = session.reset().clone();
    assert_eq!(view.selection, initial);
    assert_eq!(view.revision, 3);
    assert_eq!(view.scatter.points.len(), 3);
}

#[test]
fn observers_see_each_recompute_in_order() {
    let recorder = Arc::new(Recorder::default());
    let mut session = DashboardSession::open(dataset(), &SliderBounds::default());
    session.subscribe(recorder.clone());

    session.apply(SelectionUpdate::Site(SiteSelection::from("B")));
    session.apply(SelectionUpdate::Site(SiteSelection::All));

    let seen = recorder.seen.lock().expect("lock").clone();
    assert_eq!(seen, vec![(session.id(), 1), (session.id(), 2)]);
}

#[test]
fn identical_selections_give_identical_views() {
    let mut first = DashboardSession::open(dataset(), &SliderBounds::default());
    let mut second = DashboardSession::open(dataset(), &SliderBounds::default());
    let update = SelectionUpdate::PayloadRange(PayloadRange::new(400.0, 3000.0).expect("range"));

    let a = first.apply(update.clone()).clone();
    let b = second.apply(update).clone();
    assert_eq!(a, b);
}

#[test]
fn dataset_without_masses_starts_from_slider_bound() {
    let dataset = Arc::new(
        Dataset::from_records(vec![record("A", None, Outcome::Success)]).expect("dataset"),
    );
    let slider = SliderBounds::default();
    let session = DashboardSession::open(dataset, &slider);
    assert_eq!(session.selection().payload_range, slider.range());
    assert!(session.view().scatter.points.is_empty());
}

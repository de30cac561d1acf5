use std::collections::BTreeMap;

use shared::{
    domain::{LaunchRecord, Outcome, SiteSelection},
    protocol::{OutcomeProportions, OutcomeSlice, ScatterPoint, ScatterProjection},
};

pub fn outcomes_title(site: &SiteSelection) -> String {
    match site.site() {
        None => "Success vs. Failure for All Sites".to_string(),
        Some(name) => format!("Success vs. Failure for {name}"),
    }
}

pub fn scatter_title(site: &SiteSelection) -> String {
    match site.site() {
        None => "Payload Mass vs. Launch Success (All Sites)".to_string(),
        Some(name) => format!("Payload Mass vs. Launch Success ({name})"),
    }
}

/// Counts launches per outcome. Outcomes that do not occur get no slice.
pub fn project_outcomes(subset: &[&LaunchRecord], site: &SiteSelection) -> OutcomeProportions {
    let mut counts: BTreeMap<Outcome, usize> = BTreeMap::new();
    for record in subset {
        *counts.entry(record.outcome).or_default() += 1;
    }

    OutcomeProportions {
        title: outcomes_title(site),
        slices: counts
            .into_iter()
            .map(|(outcome, count)| OutcomeSlice { outcome, count })
            .collect(),
    }
}

/// One point per record, in subset order. Records without a payload mass are
/// skipped; `filter` never lets them through.
pub fn project_scatter(subset: &[&LaunchRecord], site: &SiteSelection) -> ScatterProjection {
    ScatterProjection {
        title: scatter_title(site),
        points: subset
            .iter()
            .filter_map(|record| {
                record.payload_mass_kg.map(|payload_mass_kg| ScatterPoint {
                    payload_mass_kg,
                    outcome: record.outcome,
                    booster_category: record.booster_category.clone(),
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter;
    use shared::domain::PayloadRange;

    fn record(site: &str, mass: f64, outcome: Outcome, category: &str) -> LaunchRecord {
        LaunchRecord {
            flight_number: None,
            site: site.into(),
            payload_mass_kg: Some(mass),
            outcome,
            booster_version: None,
            booster_category: category.into(),
        }
    }

    fn scenario() -> Vec<LaunchRecord> {
        vec![
            record("A", 500.0, Outcome::Success, "FT"),
            record("A", 9000.0, Outcome::Failure, "v1.1"),
            record("B", 3000.0, Outcome::Success, "B5"),
        ]
    }

    #[test]
    fn counts_outcomes_for_one_site() {
        let records = scenario();
        let site = SiteSelection::from("A");
        let subset = filter(
            &records,
            &site,
            &PayloadRange::new(0.0, 10_000.0).expect("range"),
        );
        let proportions = project_outcomes(&subset, &site);

        assert_eq!(proportions.title, "Success vs. Failure for A");
        assert_eq!(proportions.count(Outcome::Success), 1);
        assert_eq!(proportions.count(Outcome::Failure), 1);
        assert_eq!(proportions.total(), subset.len());
    }

    #[test]
    fn zero_count_outcomes_are_omitted() {
        let records = scenario();
        let site = SiteSelection::from("B");
        let subset = filter(
            &records,
            &site,
            &PayloadRange::new(0.0, 10_000.0).expect("range"),
        );
        let proportions = project_outcomes(&subset, &site);
        assert_eq!(
            proportions.slices,
            vec![OutcomeSlice {
                outcome: Outcome::Success,
                count: 1
            }]
        );
    }

    #[test]
    fn slices_are_ordered_failure_first() {
        let records = scenario();
        let subset: Vec<&LaunchRecord> = records.iter().collect();
        let proportions = project_outcomes(&subset, &SiteSelection::All);
        let order: Vec<Outcome> = proportions.slices.iter().map(|s| s.outcome).collect();
        assert_eq!(order, vec![Outcome::Failure, Outcome::Success]);
        assert_eq!(proportions.title, "Success vs. Failure for All Sites");
    }

    #[test]
    fn empty_subset_gives_empty_projections() {
        let proportions = project_outcomes(&[], &SiteSelection::from("nowhere"));
        assert!(proportions.slices.is_empty());
        assert_eq!(proportions.total(), 0);

        let scatter = project_scatter(&[], &SiteSelection::All);
        assert!(scatter.points.is_empty());
        assert_eq!(scatter.title, "Payload Mass vs. Launch Success (All Sites)");
    }

    #[test]
    fn scatter_keeps_one_point_per_record_including_duplicates() {
        let mut records = scenario();
        records.push(record("A", 500.0, Outcome::Success, "FT"));
        let subset: Vec<&LaunchRecord> = records.iter().collect();
        let scatter = project_scatter(&subset, &SiteSelection::from("A"));

        assert_eq!(scatter.points.len(), subset.len());
        let duplicates = scatter
            .points
            .iter()
            .filter(|point| point.payload_mass_kg == 500.0 && point.booster_category == "FT")
            .count();
        assert_eq!(duplicates, 2);
        assert_eq!(scatter.title, "Payload Mass vs. Launch Success (A)");
    }
}

use shared::domain::{LaunchRecord, PayloadRange, SiteSelection};

/// Records launched from `site` whose payload mass lies in `range`.
///
/// Rows with no payload mass never match. An unknown site name matches
/// nothing. The result keeps dataset order.
pub fn filter<'a>(
    records: &'a [LaunchRecord],
    site: &SiteSelection,
    range: &PayloadRange,
) -> Vec<&'a LaunchRecord> {
    records
        .iter()
        .filter(|record| site.matches(&record.site))
        .filter(|record| {
            record
                .payload_mass_kg
                .is_some_and(|mass| range.contains(mass))
        })
        .collect()
}

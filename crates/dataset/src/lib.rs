//! In-memory launch record table loaded from the launch CSV export.

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use shared::domain::{LaunchRecord, Outcome, PayloadRange};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed launch csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid launch record at data row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },
    #[error("dataset contains no launch records")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Flight Number", default)]
    flight_number: Option<u32>,
    #[serde(rename = "Launch Site")]
    launch_site: String,
    #[serde(rename = "class")]
    class: u8,
    #[serde(rename = "Payload Mass (kg)", default)]
    payload_mass_kg: Option<f64>,
    #[serde(rename = "Booster Version", default)]
    booster_version: Option<String>,
    #[serde(rename = "Booster Version Category")]
    booster_category: String,
}

impl CsvRow {
    fn into_record(self) -> Result<LaunchRecord, String> {
        let outcome = Outcome::try_from(self.class).map_err(|err| err.to_string())?;
        // Blank and NaN cells are both "mass unknown".
        let payload_mass_kg = self.payload_mass_kg.filter(|mass| !mass.is_nan());
        Ok(LaunchRecord {
            flight_number: self.flight_number,
            site: self.launch_site.trim().to_string(),
            payload_mass_kg,
            outcome,
            booster_version: self
                .booster_version
                .map(|version| version.trim().to_string())
                .filter(|version| !version.is_empty()),
            booster_category: self.booster_category.trim().to_string(),
        })
    }
}

/// Immutable launch table plus the metadata the dashboard derives from it.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<LaunchRecord>,
    sites: Vec<String>,
    payload_extent: Option<PayloadRange>,
    unknown_payload_count: usize,
}

impl Dataset {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_csv_reader(bytes.as_slice())?;
        info!(
            path = %path.display(),
            records = dataset.len(),
            sites = dataset.sites.len(),
            unknown_payloads = dataset.unknown_payload_count,
            "loaded launch dataset"
        );
        Ok(dataset)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row_number = index + 1;
            let record = row?
                .into_record()
                .map_err(|reason| DatasetError::InvalidRecord {
                    row: row_number,
                    reason,
                })?;
            records.push(record);
        }
        Self::from_records(records)
    }

    pub fn from_records(records: Vec<LaunchRecord>) -> Result<Self, DatasetError> {
        if records.is_empty() {
            return Err(DatasetError::Empty);
        }

        let mut sites: Vec<String> = Vec::new();
        let mut extent: Option<(f64, f64)> = None;
        let mut unknown_payload_count = 0;

        for (index, record) in records.iter().enumerate() {
            validate_record(record).map_err(|reason| DatasetError::InvalidRecord {
                row: index + 1,
                reason,
            })?;

            if !sites.iter().any(|site| site == &record.site) {
                sites.push(record.site.clone());
            }

            match record.payload_mass_kg {
                Some(mass) => {
                    extent = Some(match extent {
                        Some((min, max)) => (min.min(mass), max.max(mass)),
                        None => (mass, mass),
                    });
                }
                None => unknown_payload_count += 1,
            }
        }

        let payload_extent = extent.and_then(|(min, max)| PayloadRange::new(min, max).ok());
        debug!(?sites, ?payload_extent, "derived dataset metadata");

        Ok(Self {
            records,
            sites,
            payload_extent,
            unknown_payload_count,
        })
    }

    pub fn records(&self) -> &[LaunchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct launch sites in the order they first appear.
    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn is_known_site(&self, site: &str) -> bool {
        self.sites.iter().any(|known| known == site)
    }

    /// `[min, max]` over the known payload masses; `None` if no row has one.
    pub fn payload_extent(&self) -> Option<PayloadRange> {
        self.payload_extent
    }

    pub fn unknown_payload_count(&self) -> usize {
        self.unknown_payload_count
    }
}

fn validate_record(record: &LaunchRecord) -> Result<(), String> {
    if record.site.trim().is_empty() {
        return Err("launch site is empty".into());
    }
    if record.booster_category.trim().is_empty() {
        return Err("booster version category is empty".into());
    }
    if let Some(mass) = record.payload_mass_kg {
        if !mass.is_finite() {
            return Err(format!("payload mass {mass} is not a finite number"));
        }
        if mass < 0.0 {
            return Err(format!("payload mass {mass} is negative"));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

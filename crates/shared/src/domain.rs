use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Dropdown value meaning "no site restriction".
pub const ALL_SITES: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Binary launch classification, encoded as `0`/`1` on the wire like the
/// `class` column of the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Outcome {
    Failure,
    Success,
}

impl Outcome {
    pub fn as_class(self) -> u8 {
        match self {
            Outcome::Failure => 0,
            Outcome::Success => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Failure => "Failure",
            Outcome::Success => "Success",
        }
    }
}

impl From<Outcome> for u8 {
    fn from(value: Outcome) -> Self {
        value.as_class()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("outcome class must be 0 or 1, got {0}")]
pub struct InvalidOutcome(pub u8);

impl TryFrom<u8> for Outcome {
    type Error = InvalidOutcome;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Outcome::Failure),
            1 => Ok(Outcome::Success),
            other => Err(InvalidOutcome(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<u32>,
    pub site: String,
    /// Kilograms; `None` when the source row has no mass.
    pub payload_mass_kg: Option<f64>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booster_version: Option<String>,
    pub booster_category: String,
}

/// Site dropdown value: the `ALL` sentinel or one concrete site name.
///
/// Any string parses; names that match no site in the data are kept as-is and
/// simply select nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SiteSelection {
    #[default]
    All,
    Site(String),
}

impl SiteSelection {
    pub fn matches(&self, site: &str) -> bool {
        match self {
            SiteSelection::All => true,
            SiteSelection::Site(selected) => selected == site,
        }
    }

    pub fn site(&self) -> Option<&str> {
        match self {
            SiteSelection::All => None,
            SiteSelection::Site(name) => Some(name),
        }
    }
}

impl From<String> for SiteSelection {
    fn from(value: String) -> Self {
        if value == ALL_SITES {
            SiteSelection::All
        } else {
            SiteSelection::Site(value)
        }
    }
}

impl From<&str> for SiteSelection {
    fn from(value: &str) -> Self {
        SiteSelection::from(value.to_string())
    }
}

impl From<SiteSelection> for String {
    fn from(value: SiteSelection) -> Self {
        match value {
            SiteSelection::All => ALL_SITES.to_string(),
            SiteSelection::Site(name) => name,
        }
    }
}

impl FromStr for SiteSelection {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SiteSelection::from(s))
    }
}

impl fmt::Display for SiteSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteSelection::All => f.write_str(ALL_SITES),
            SiteSelection::Site(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RangeError {
    #[error("payload range bounds must be finite numbers")]
    NotFinite,
    #[error("payload range is inverted: low {low} > high {high}")]
    Inverted { low: f64, high: f64 },
    #[error("payload range [{low}, {high}] is outside the slider bound [{min}, {max}]")]
    OutOfBounds {
        low: f64,
        high: f64,
        min: f64,
        max: f64,
    },
}

/// Inclusive payload-mass interval in kilograms. `low <= high` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPayloadRange")]
pub struct PayloadRange {
    low: f64,
    high: f64,
}

#[derive(Deserialize)]
struct RawPayloadRange {
    low: f64,
    high: f64,
}

impl TryFrom<RawPayloadRange> for PayloadRange {
    type Error = RangeError;

    fn try_from(value: RawPayloadRange) -> Result<Self, Self::Error> {
        PayloadRange::new(value.low, value.high)
    }
}

impl PayloadRange {
    pub fn new(low: f64, high: f64) -> Result<Self, RangeError> {
        if !low.is_finite() || !high.is_finite() {
            return Err(RangeError::NotFinite);
        }
        if low > high {
            return Err(RangeError::Inverted { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn contains(&self, mass_kg: f64) -> bool {
        self.low <= mass_kg && mass_kg <= self.high
    }

    pub fn is_within(&self, outer: &PayloadRange) -> bool {
        outer.low <= self.low && self.high <= outer.high
    }
}

/// Upper bound on the tick labels a slider produces.
pub const MAX_SLIDER_MARKS: u32 = 100;

/// Slider configuration for the payload range input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl SliderBounds {
    pub fn range(&self) -> PayloadRange {
        PayloadRange {
            low: self.min.min(self.max),
            high: self.max.max(self.min),
        }
    }

    /// Tick labels at every step, keyed by position. Never more than
    /// [`MAX_SLIDER_MARKS`] + 1 of them.
    pub fn marks(&self) -> Vec<(f64, String)> {
        let usable = self.step.is_finite() && self.step > 0.0 && self.min.is_finite();
        if !usable || self.max.is_nan() || self.max < self.min {
            return vec![(self.min, format_mark(self.min))];
        }
        (0..=MAX_SLIDER_MARKS)
            .map(|index| self.min + f64::from(index) * self.step)
            .take_while(|value| *value <= self.max)
            .map(|value| (value, format_mark(value)))
            .collect()
    }

    /// Smallest step that keeps the whole slider within [`MAX_SLIDER_MARKS`].
    pub fn min_step(&self) -> f64 {
        (self.max - self.min).abs() / f64::from(MAX_SLIDER_MARKS)
    }
}

impl Default for SliderBounds {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 10_000.0,
            step: 1_000.0,
        }
    }
}

fn format_mark(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// The mutable per-session input state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub site: SiteSelection,
    pub payload_range: PayloadRange,
}

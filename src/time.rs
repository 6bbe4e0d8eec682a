//! Time axis of a gridded dataset.
//!
//! A [`TimeAxis`] is an ordered, strictly increasing sequence of timestamps.
//! It resolves a query time to the pair of bracketing indices and the linear
//! blending fraction between them.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{GridPropError, Result};

/// Ordered sequence of timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NaiveDateTime>", into = "Vec<NaiveDateTime>")]
pub struct TimeAxis {
    times: Vec<NaiveDateTime>,
}

impl TryFrom<Vec<NaiveDateTime>> for TimeAxis {
    type Error = GridPropError;

    fn try_from(times: Vec<NaiveDateTime>) -> Result<Self> {
        Self::new(times)
    }
}

impl From<TimeAxis> for Vec<NaiveDateTime> {
    fn from(axis: TimeAxis) -> Self {
        axis.times
    }
}

impl TimeAxis {
    /// Create a time axis from strictly increasing timestamps
    pub fn new(times: Vec<NaiveDateTime>) -> Result<Self> {
        if times.is_empty() {
            return Err(GridPropError::construction("Time axis cannot be empty"));
        }
        if let Some(w) = times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(GridPropError::construction(format!(
                "Time axis must be strictly increasing: {} is followed by {}",
                w[0], w[1]
            )));
        }
        Ok(Self { times })
    }

    /// A single-timestamp axis for stationary data
    pub fn constant(time: NaiveDateTime) -> Self {
        Self { times: vec![time] }
    }

    /// Decode CF-convention numeric times such as `hours since 2016-01-01 00:00:00`
    pub fn from_cf(values: &[f64], units: &str) -> Result<Self> {
        let (step, epoch) = parse_cf_units(units)?;
        let times = values
            .iter()
            .map(|&v| {
                let micros = (v * step as f64).round();
                // i64::MAX as f64 rounds up, so the upper bound is exclusive
                let in_range = micros.is_finite() && micros >= i64::MIN as f64 && micros < i64::MAX as f64;
                in_range
                    .then(|| Duration::microseconds(micros as i64))
                    .and_then(|offset| epoch.checked_add_signed(offset))
                    .ok_or_else(|| {
                        GridPropError::construction(format!(
                            "Time value {} {} is outside the representable range",
                            v, units
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(times)
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn min_time(&self) -> NaiveDateTime {
        self.times[0]
    }

    pub fn max_time(&self) -> NaiveDateTime {
        self.times[self.times.len() - 1]
    }

    /// Fail with `OutOfRange` when `time` lies outside `[min_time, max_time]`
    pub fn valid_time(&self, time: NaiveDateTime) -> Result<()> {
        if time < self.min_time() || time > self.max_time() {
            return Err(GridPropError::OutOfRange {
                time: time.to_string(),
                min_time: self.min_time().to_string(),
                max_time: self.max_time().to_string(),
            });
        }
        Ok(())
    }

    /// Index of the first timestamp at or after `time`.
    ///
    /// Returns `len()` for times past the end, which is only reachable with
    /// `extrapolate` set.
    pub fn index_of(&self, time: NaiveDateTime, extrapolate: bool) -> Result<usize> {
        if !extrapolate {
            self.valid_time(time)?;
        }
        Ok(self.times.partition_point(|t| *t < time))
    }

    /// Fraction in `[0, 1]` for blending between `index_of(t) - 1` and `index_of(t)`
    pub fn interp_alpha(&self, time: NaiveDateTime, extrapolate: bool) -> Result<f64> {
        let i1 = self.index_of(time, extrapolate)?;
        if i1 >= self.times.len() {
            return Ok(1.0);
        }
        if i1 == 0 {
            return Ok(0.0);
        }
        let t0 = self.times[i1 - 1];
        let t1 = self.times[i1];
        let span = (t1 - t0).num_microseconds().unwrap_or(i64::MAX) as f64;
        let offset = (time - t0).num_microseconds().unwrap_or(0) as f64;
        Ok(offset / span)
    }
}

/// Parse `<unit> since <epoch>` into (microseconds per unit, epoch)
fn parse_cf_units(units: &str) -> Result<(i64, NaiveDateTime)> {
    let bad = || GridPropError::construction(format!("Unrecognized time units: {}", units));

    let (unit, epoch) = units.split_once(" since ").ok_or_else(bad)?;
    let step = match unit.trim().to_lowercase().as_str() {
        "seconds" | "second" | "secs" | "sec" | "s" => 1_000_000,
        "minutes" | "minute" | "mins" | "min" => 60 * 1_000_000,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3_600 * 1_000_000,
        "days" | "day" | "d" => 86_400 * 1_000_000,
        _ => return Err(bad()),
    };

    let parsed = parse_timestamp(epoch).ok_or_else(bad)?;
    Ok((step, parsed))
}

/// Parse an ISO-8601-like timestamp, with or without a time of day
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim().trim_end_matches('Z').trim_end_matches(" UTC");
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

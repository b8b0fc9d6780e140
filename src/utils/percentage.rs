use std::{fmt::Display, ops::Deref, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Percentage in the range of 0 to 100. Accuracy scores and history filters are expressed with it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

impl Percentage {
    pub const ZERO: Percentage = Percentage(0.);
    pub const FULL: Percentage = Percentage(100.);

    pub fn new_opt(value: f64) -> Option<Percentage> {
        if (0. ..=100.).contains(&value) {
            Some(Percentage(value))
        } else {
            None
        }
    }

    /// Forces a value into the valid range. NaN collapses to zero.
    pub fn clamped(value: f64) -> Percentage {
        if value.is_nan() {
            Self::ZERO
        } else {
            Percentage(value.clamp(0., 100.))
        }
    }
}

impl FromStr for Percentage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // This means that 100%% also works, but I think I'm fine with that
        let s = s.trim_end_matches("%");
        let v = s.parse::<f64>()?;
        Percentage::new_opt(v).ok_or_else(|| anyhow!("Can't parse {s} into percentage"))
    }
}

impl TryFrom<f64> for Percentage {
    type Error = anyhow::Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Percentage::new_opt(value).ok_or_else(|| anyhow!("{value} is not a valid percentage"))
    }
}

impl From<Percentage> for f64 {
    fn from(value: Percentage) -> Self {
        value.0
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

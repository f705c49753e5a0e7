//! Attribute bounds and the bounds-checking primitive.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::value::AttributeValue;

/// The allowed range of an attribute template.
///
/// Real bounds compare units by exact string equality; no unit conversion is
/// performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Bounds {
    Categorical {
        categories: BTreeSet<String>,
    },
    Real {
        lower_bound: f64,
        upper_bound: f64,
        default_units: String,
    },
    Integer {
        lower_bound: i64,
        upper_bound: i64,
    },
}

impl Bounds {
    #[must_use]
    pub fn categorical<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Categorical {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn real(lower_bound: f64, upper_bound: f64, default_units: impl Into<String>) -> Self {
        Self::Real {
            lower_bound,
            upper_bound,
            default_units: default_units.into(),
        }
    }

    #[must_use]
    pub const fn integer(lower_bound: i64, upper_bound: i64) -> Self {
        Self::Integer {
            lower_bound,
            upper_bound,
        }
    }

    /// Whether the bounds themselves are well formed.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::Categorical { categories } => !categories.is_empty(),
            Self::Real {
                lower_bound,
                upper_bound,
                ..
            } => lower_bound.is_finite() && upper_bound.is_finite() && lower_bound <= upper_bound,
            Self::Integer {
                lower_bound,
                upper_bound,
            } => lower_bound <= upper_bound,
        }
    }

    /// Check whether a value lies within these bounds.
    ///
    /// A value of a different family (e.g. a real value against categorical
    /// bounds) is never contained.
    #[must_use]
    pub fn contains(&self, value: &AttributeValue) -> bool {
        match (self, value) {
            (Self::Categorical { categories }, AttributeValue::NominalCategorical { category }) => {
                categories.contains(category)
            }
            (
                Self::Categorical { categories },
                AttributeValue::DiscreteCategorical { probabilities },
            ) => !probabilities.is_empty() && probabilities.keys().all(|k| categories.contains(k)),
            (
                Self::Real {
                    lower_bound,
                    upper_bound,
                    default_units,
                },
                AttributeValue::NominalReal { nominal, units },
            ) => units == default_units && within(*lower_bound, *upper_bound, *nominal),
            (
                Self::Real {
                    lower_bound,
                    upper_bound,
                    default_units,
                },
                AttributeValue::UniformReal {
                    lower_bound: lo,
                    upper_bound: hi,
                    units,
                },
            ) => {
                units == default_units
                    && lo <= hi
                    && within(*lower_bound, *upper_bound, *lo)
                    && within(*lower_bound, *upper_bound, *hi)
            }
            (
                Self::Real {
                    lower_bound,
                    upper_bound,
                    default_units,
                },
                AttributeValue::NormalReal { mean, std, units },
            ) => {
                units == default_units
                    && *std >= 0.0
                    && within(*lower_bound, *upper_bound, *mean)
            }
            (
                Self::Integer {
                    lower_bound,
                    upper_bound,
                },
                AttributeValue::NominalInteger { nominal },
            ) => lower_bound <= nominal && nominal <= upper_bound,
            (
                Self::Integer {
                    lower_bound,
                    upper_bound,
                },
                AttributeValue::UniformInteger {
                    lower_bound: lo,
                    upper_bound: hi,
                },
            ) => lower_bound <= lo && lo <= hi && hi <= upper_bound,
            _ => false,
        }
    }
}

fn within(lower: f64, upper: f64, x: f64) -> bool {
    x.is_finite() && lower <= x && x <= upper
}

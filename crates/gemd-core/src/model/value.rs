//! Attribute values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A concrete (possibly uncertain) attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeValue {
    NominalReal {
        nominal: f64,
        units: String,
    },
    UniformReal {
        lower_bound: f64,
        upper_bound: f64,
        units: String,
    },
    NormalReal {
        mean: f64,
        std: f64,
        units: String,
    },
    NominalInteger {
        nominal: i64,
    },
    UniformInteger {
        lower_bound: i64,
        upper_bound: i64,
    },
    NominalCategorical {
        category: String,
    },
    DiscreteCategorical {
        probabilities: BTreeMap<String, f64>,
    },
}

impl AttributeValue {
    #[must_use]
    pub fn nominal_real(nominal: f64, units: impl Into<String>) -> Self {
        Self::NominalReal {
            nominal,
            units: units.into(),
        }
    }

    #[must_use]
    pub fn uniform_real(lower_bound: f64, upper_bound: f64, units: impl Into<String>) -> Self {
        Self::UniformReal {
            lower_bound,
            upper_bound,
            units: units.into(),
        }
    }

    #[must_use]
    pub fn normal_real(mean: f64, std: f64, units: impl Into<String>) -> Self {
        Self::NormalReal {
            mean,
            std,
            units: units.into(),
        }
    }

    #[must_use]
    pub const fn nominal_integer(nominal: i64) -> Self {
        Self::NominalInteger { nominal }
    }

    #[must_use]
    pub const fn uniform_integer(lower_bound: i64, upper_bound: i64) -> Self {
        Self::UniformInteger {
            lower_bound,
            upper_bound,
        }
    }

    #[must_use]
    pub fn nominal_categorical(category: impl Into<String>) -> Self {
        Self::NominalCategorical {
            category: category.into(),
        }
    }

    #[must_use]
    pub fn discrete_categorical<I, S>(probabilities: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self::DiscreteCategorical {
            probabilities: probabilities
                .into_iter()
                .map(|(k, p)| (k.into(), p))
                .collect(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NominalReal { nominal, units } => write!(f, "{} {}", nominal, units),
            Self::UniformReal {
                lower_bound,
                upper_bound,
                units,
            } => write!(f, "[{}, {}] {}", lower_bound, upper_bound, units),
            Self::NormalReal { mean, std, units } => write!(f, "{} ± {} {}", mean, std, units),
            Self::NominalInteger { nominal } => write!(f, "{}", nominal),
            Self::UniformInteger {
                lower_bound,
                upper_bound,
            } => write!(f, "[{}, {}]", lower_bound, upper_bound),
            Self::NominalCategorical { category } => write!(f, "'{}'", category),
            Self::DiscreteCategorical { probabilities } => {
                let keys: Vec<&str> = probabilities.keys().map(String::as_str).collect();
                write!(f, "{{{}}}", keys.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_serializes_with_type_tag() {
        let value = AttributeValue::nominal_categorical("X-Ray Panel");
        let json = serde_json::to_value(&value).expect("serialize");
        assert_eq!(json["type"], "nominal_categorical");
        assert_eq!(json["category"], "X-Ray Panel");
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(
            AttributeValue::nominal_real(1.5, "K").to_string(),
            "1.5 K"
        );
        assert_eq!(AttributeValue::nominal_integer(3).to_string(), "3");
    }
}

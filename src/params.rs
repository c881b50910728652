//! Typed parameter values passed through to the database backend, and the
//! tags naming the columns of search input and output maps.
use std::fmt::Display;
use std::str::FromStr;

use indexmap::IndexMap;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A backend-specific parameter value. Only strings and numbers are
/// exchanged with a database backend.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueParseError {
    #[error("Value {0:?} is not numeric")]
    NotNumeric(String),
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub fn to_f64(&self) -> Result<f64, ValueParseError> {
        match self {
            Self::Int(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::String(s) => s
                .parse()
                .map_err(|_| ValueParseError::NotNumeric(s.clone())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $($t:ty),+) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Self::$variant(value.into())
                }
            }
        )+
    };
}

value_from!(Int, i64, i32, u32, u16, u8);
value_from!(Float, f64, f32);
value_from!(String, String, &str);

/// Opaque backend tuning parameters, keyed by name in insertion order.
///
/// The search core never reads these. They are forwarded to the
/// [`DatabaseGateway`](crate::io::DatabaseGateway) verbatim, and the caller
/// and gateway agree on the recognized keys.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ExtraParams(IndexMap<String, Value>);

impl ExtraParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style [`ExtraParams::insert`]
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ExtraParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Display for ExtraParams {
    /// Renders `key = value` pairs separated by commas, quoting strings
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match v {
                Value::String(s) => write!(f, "{k} = {s:?}")?,
                _ => write!(f, "{k} = {v}")?,
            }
        }
        Ok(())
    }
}

/// The acquisition polarity a library search is restricted to
#[repr(i8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IonizationMode {
    #[default]
    Positive = 1,
    Negative = -1,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Unknown ionization mode {0:?}")]
pub struct IonizationModeParseError(String);

impl FromStr for IonizationMode {
    type Err = IonizationModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" | "+" => Ok(Self::Positive),
            "negative" | "neg" | "-" => Ok(Self::Negative),
            _ => Err(IonizationModeParseError(s.to_string())),
        }
    }
}

impl Display for IonizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => f.write_str("positive"),
            Self::Negative => f.write_str("negative"),
        }
    }
}

/// Column tags for search input and annotation tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Field {
    /// Peak mass-to-charge ratio
    MZ,
    /// Peak intensity
    INT,
    /// Molecule identifier
    MOLID,
    /// Molecule names
    MOLNAMES,
    /// Theoretical m/z
    MZTHEO,
    /// Ion attribution
    ATTR,
    /// Composition
    COMP,
    /// Chromatographic column
    COL,
    /// Retention time on the chromatographic column
    COLRT,
}

impl Field {
    pub const fn name(&self) -> &'static str {
        match self {
            Field::MZ => "mz",
            Field::INT => "int",
            Field::MOLID => "molid",
            Field::MOLNAMES => "molnames",
            Field::MZTHEO => "mztheo",
            Field::ATTR => "attr",
            Field::COMP => "comp",
            Field::COL => "col",
            Field::COLRT => "colrt",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_extra_params_order_and_render() {
        let params = ExtraParams::new().with("ppm", 5).with("dmz", 0.005).with("mode", "pos");
        assert_eq!(params.len(), 3);
        let keys: Vec<_> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["ppm", "dmz", "mode"]);
        assert_eq!(params.to_string(), "ppm = 5, dmz = 0.005, mode = \"pos\"");
        assert_eq!(params.get("ppm").unwrap().to_f64().unwrap(), 5.0);
        assert!(params.get("mode").unwrap().to_f64().is_err());
    }

    #[test]
    fn test_ionization_mode_parse() {
        assert_eq!("POSITIVE".parse::<IonizationMode>().unwrap(), IonizationMode::Positive);
        assert_eq!("neg".parse::<IonizationMode>().unwrap(), IonizationMode::Negative);
        assert!("neutral".parse::<IonizationMode>().is_err());
        assert_eq!(IonizationMode::Negative as i8, -1);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(3u8), Value::Int(3));
        assert_eq!(Value::from(2.5f32), Value::Float(2.5));
        assert_eq!(Value::from("12.5").to_f64().unwrap(), 12.5);
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert!(Value::Float(1.0).is_numeric());
    }
}

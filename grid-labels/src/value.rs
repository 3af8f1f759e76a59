use std::collections::BTreeMap;

/// A label value. Labels are a typed union of string, number, or boolean —
/// never arbitrary JSON — so ingestion rejects anything else up front.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl LabelValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LabelValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LabelValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LabelValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for LabelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelValue::Str(s) => write!(f, "{s}"),
            LabelValue::Num(n) => write!(f, "{n}"),
            LabelValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Map of label keys to label values, attached to a state.
pub type LabelMap = BTreeMap<String, LabelValue>;

// Label maps attached to APM events.
//
// Labels hold string-valued metadata, numeric labels hold float64-valued
// metadata. Both support single- and multi-valued entries; slice attributes
// from the source telemetry map to the multi-valued form.

use std::collections::BTreeMap;

use serde::Serialize;

/// String-valued labels keyed by (dot-replaced) attribute name.
pub type Labels = BTreeMap<String, Label>;

/// Numeric labels keyed by (dot-replaced) attribute name.
pub type NumericLabels = BTreeMap<String, NumericLabel>;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Label {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl Label {
    pub fn value(value: impl Into<String>) -> Self {
        Label {
            value: Some(value.into()),
            values: Vec::new(),
        }
    }

    pub fn values(values: Vec<String>) -> Self {
        Label {
            value: None,
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NumericLabel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,
}

impl NumericLabel {
    pub fn value(value: f64) -> Self {
        NumericLabel {
            value: Some(value),
            values: Vec::new(),
        }
    }

    pub fn values(values: Vec<f64>) -> Self {
        NumericLabel {
            value: None,
            values,
        }
    }
}

//! Observation.value[x] discrimination

use super::datatypes::{CodeableConcept, Quantity, Range};
use super::observation::Observation;
use serde::{Deserialize, Serialize};

/// Marker carried by [`ExtractedValue::Unknown`].
pub const UNKNOWN_TYPE: &str = "Unknown type";

/// The single populated value of an Observation, tagged by its FHIR element name.
///
/// Serializes as a one-member object, e.g. `{"valueInteger": 7}` or
/// `{"value": "Unknown type"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtractedValue {
    #[serde(rename = "valueQuantity")]
    Quantity(Quantity),
    #[serde(rename = "valueBoolean")]
    Boolean(bool),
    #[serde(rename = "valueInteger")]
    Integer(i64),
    #[serde(rename = "valueString")]
    String(String),
    #[serde(rename = "valueRange")]
    Range(Range),
    #[serde(rename = "valueCodeableConcept")]
    CodeableConcept(CodeableConcept),
    #[serde(rename = "value")]
    Unknown(String),
}

impl ExtractedValue {
    pub fn unknown() -> Self {
        ExtractedValue::Unknown(UNKNOWN_TYPE.to_string())
    }

    /// FHIR element name of the variant
    pub fn element_name(&self) -> &'static str {
        match self {
            ExtractedValue::Quantity(_) => "valueQuantity",
            ExtractedValue::Boolean(_) => "valueBoolean",
            ExtractedValue::Integer(_) => "valueInteger",
            ExtractedValue::String(_) => "valueString",
            ExtractedValue::Range(_) => "valueRange",
            ExtractedValue::CodeableConcept(_) => "valueCodeableConcept",
            ExtractedValue::Unknown(_) => "value",
        }
    }
}

/// Pick the value of an Observation.
///
/// When more than one field is populated the first in this order wins:
/// quantity, boolean, integer, string, range, codeableConcept. Callers match
/// on the variant, so the order must not change.
///
/// `false`, `0` and `""` do not count as populated and fall through to the
/// next field.
pub fn get_value(observation: &Observation) -> ExtractedValue {
    if let Some(quantity) = &observation.value_quantity {
        ExtractedValue::Quantity(quantity.clone())
    } else if observation.value_boolean == Some(true) {
        ExtractedValue::Boolean(true)
    } else if let Some(integer) = observation.value_integer.filter(|i| *i != 0) {
        ExtractedValue::Integer(integer)
    } else if let Some(string) = observation.value_string.as_deref().filter(|s| !s.is_empty()) {
        ExtractedValue::String(string.to_string())
    } else if let Some(range) = &observation.value_range {
        ExtractedValue::Range(range.clone())
    } else if let Some(concept) = &observation.value_codeable_concept {
        ExtractedValue::CodeableConcept(concept.clone())
    } else {
        ExtractedValue::unknown()
    }
}

//! Observation resource and single-lookup result

use super::datatypes::{CodeableConcept, Quantity, Range};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Resource type accepted by the normalizer.
pub const OBSERVATION: &str = "Observation";

/// Status marker carried by the not-found sentinel.
pub const NOT_FOUND_STATUS: &str = "notfound";

/// Placeholder text carried by the not-found sentinel.
pub const NO_DATA_AVAILABLE: &str = "No Data Available";

/// FHIR Observation resource
///
/// Only the fields this crate reads are typed. Everything else the server
/// sent is kept in `extensions`, including typed members whose shape does
/// not match (see [`Observation::from_value`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Resource type - always "Observation"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// registered | preliminary | final | amended | ...
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Vec<CodeableConcept>>,

    /// Type of observation (code / type)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_integer: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_range: Option<Range>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_codeable_concept: Option<CodeableConcept>,

    /// Additional content beyond core fields
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    OBSERVATION.to_string()
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            resource_type: default_resource_type(),
            id: None,
            status: None,
            category: None,
            code: None,
            effective_date_time: None,
            value_quantity: None,
            value_boolean: None,
            value_integer: None,
            value_string: None,
            value_range: None,
            value_codeable_concept: None,
            extensions: HashMap::new(),
        }
    }
}

impl Observation {
    /// Parse from JSON Value
    ///
    /// Members that do not fit their typed field (a DSTU2 `category` object,
    /// a string `valueInteger`) are moved to `extensions` unchanged instead of
    /// failing the parse. Only a non-object value is an error.
    pub fn from_value(value: &Value) -> crate::Result<Self> {
        let err = match serde_json::from_value(value.clone()) {
            Ok(observation) => return Ok(observation),
            Err(e) => e,
        };
        let Value::Object(members) = value else {
            return Err(err.into());
        };

        let mut typed = members.clone();
        let mut mismatched = HashMap::new();
        for (name, member) in members {
            if !member_fits(name, member) {
                typed.remove(name);
                mismatched.insert(name.clone(), member.clone());
            }
        }

        let mut observation: Observation = serde_json::from_value(Value::Object(typed))?;
        tracing::debug!(
            id = observation.id.as_deref().unwrap_or("<none>"),
            members = ?mismatched.keys().collect::<Vec<_>>(),
            "Observation members kept untyped"
        );
        observation.extensions.extend(mismatched);
        Ok(observation)
    }

    /// Convert to JSON Value
    pub fn to_value(&self) -> crate::Result<Value> {
        serde_json::to_value(self).map_err(crate::Error::from)
    }
}

/// Whether a member deserializes into the typed field of the same name.
fn member_fits(name: &str, member: &Value) -> bool {
    fn fits<T: DeserializeOwned>(member: &Value) -> bool {
        T::deserialize(member).is_ok()
    }

    match name {
        "resourceType" | "id" | "status" | "effectiveDateTime" | "valueString" => {
            fits::<String>(member)
        }
        "category" => fits::<Vec<CodeableConcept>>(member),
        "code" | "valueCodeableConcept" => fits::<CodeableConcept>(member),
        "valueQuantity" => fits::<Quantity>(member),
        "valueBoolean" => fits::<bool>(member),
        "valueInteger" => fits::<i64>(member),
        "valueRange" => fits::<Range>(member),
        _ => true,
    }
}

/// Placeholder value of the not-found sentinel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderValue {
    pub string_value: String,
    pub value_type: String,
}

/// Observation-shaped stand-in returned when a single lookup matched nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFound {
    /// The code that was looked up
    pub code: String,
    pub status: String,
    pub value: PlaceholderValue,
}

impl NotFound {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            status: NOT_FOUND_STATUS.to_string(),
            value: PlaceholderValue {
                string_value: NO_DATA_AVAILABLE.to_string(),
                value_type: "string".to_string(),
            },
        }
    }
}

/// Result of a single latest-by-code lookup: a real Observation or the sentinel.
///
/// Serializes to the bare Observation or the bare sentinel object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationLookup {
    NotFound(NotFound),
    Found(Box<Observation>),
}

impl ObservationLookup {
    pub fn is_found(&self) -> bool {
        matches!(self, ObservationLookup::Found(_))
    }

    pub fn observation(&self) -> Option<&Observation> {
        match self {
            ObservationLookup::Found(obs) => Some(obs),
            ObservationLookup::NotFound(_) => None,
        }
    }

    pub fn not_found(&self) -> Option<&NotFound> {
        match self {
            ObservationLookup::NotFound(sentinel) => Some(sentinel),
            ObservationLookup::Found(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentinel_shape() {
        let json = serde_json::to_value(NotFound::new("1234")).unwrap();
        assert_eq!(
            json,
            json!({
                "code": "1234",
                "status": "notfound",
                "value": {"stringValue": "No Data Available", "valueType": "string"}
            })
        );
    }

    #[test]
    fn test_observation_round_trip_keeps_unknown_fields() {
        let json = json!({
            "resourceType": "Observation",
            "id": "glucose",
            "status": "final",
            "code": {"coding": [{"system": "http://loinc.org", "code": "15074-8"}]},
            "subject": {"reference": "Patient/example"},
            "effectiveDateTime": "2013-04-02T09:30:10+01:00",
            "valueQuantity": {"value": 6.3, "unit": "mmol/l"},
            "interpretation": [{"text": "High"}]
        });

        let obs = Observation::from_value(&json).unwrap();
        assert_eq!(obs.id.as_deref(), Some("glucose"));
        assert!(obs.extensions.contains_key("subject"));
        assert_eq!(obs.to_value().unwrap(), json);
    }

    #[test]
    fn test_dstu2_category_is_kept_untyped() {
        let json = json!({
            "resourceType": "Observation",
            "id": "bp",
            "category": {"coding": [{"code": "vital-signs"}]},
            "code": {"coding": [{"system": "http://loinc.org", "code": "8867-4"}]},
            "valueQuantity": {"value": 72, "unit": "beats/minute"}
        });

        let obs = Observation::from_value(&json).unwrap();
        assert_eq!(obs.id.as_deref(), Some("bp"));
        assert!(obs.category.is_none());
        assert_eq!(obs.extensions["category"], json["category"]);
        assert!(obs.code.unwrap().has_code("http://loinc.org", "8867-4"));
        assert!(obs.value_quantity.is_some());
    }

    #[test]
    fn test_mismatched_members_round_trip() {
        let json = json!({
            "resourceType": "Observation",
            "id": "odd",
            "status": "final",
            "valueInteger": "seven",
            "valueQuantity": {"value": "72"}
        });

        let obs = Observation::from_value(&json).unwrap();
        assert_eq!(obs.status.as_deref(), Some("final"));
        assert!(obs.value_integer.is_none());
        assert!(obs.value_quantity.is_none());
        assert_eq!(obs.to_value().unwrap(), json);
    }

    #[test]
    fn test_non_object_is_an_error() {
        assert!(Observation::from_value(&json!(["Observation"])).is_err());
    }

    #[test]
    fn test_lookup_serializes_untagged() {
        let found = ObservationLookup::Found(Box::new(Observation {
            id: Some("a".to_string()),
            ..Observation::default()
        }));
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["resourceType"], "Observation");
        assert_eq!(json["id"], "a");

        let missing = ObservationLookup::NotFound(NotFound::new("789"));
        let json = serde_json::to_value(&missing).unwrap();
        assert_eq!(json["status"], "notfound");
        assert!(!missing.is_found());
        assert_eq!(missing.not_found().map(|s| s.code.as_str()), Some("789"));
    }

    #[test]
    fn test_lookup_deserializes_both_shapes() {
        let sentinel: ObservationLookup = serde_json::from_value(json!({
            "code": "1234",
            "status": "notfound",
            "value": {"stringValue": "No Data Available", "valueType": "string"}
        }))
        .unwrap();
        assert!(!sentinel.is_found());

        let real: ObservationLookup = serde_json::from_value(json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {"text": "Heart rate"},
            "valueQuantity": {"value": 72}
        }))
        .unwrap();
        assert!(real.is_found());
    }
}

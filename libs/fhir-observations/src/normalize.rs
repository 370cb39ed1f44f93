//! Search result normalization
//!
//! Reads the first page of a search result, drops OperationOutcome entries
//! and anything that is not an Observation, and keeps server order.

use crate::models::{
    Bundle, NotFound, Observation, ObservationLookup, OBSERVATION, OPERATION_OUTCOME,
};
use serde_json::Value;

/// Resources of the first page, minus OperationOutcome entries and entries without a resource.
pub fn resources_from(pages: &[Bundle]) -> Vec<&Value> {
    let Some(first) = pages.first() else {
        return Vec::new();
    };

    first
        .entries()
        .iter()
        .filter(|entry| {
            let is_outcome = entry.resource_type() == Some(OPERATION_OUTCOME);
            if is_outcome {
                tracing::trace!(full_url = ?entry.full_url, "Dropping OperationOutcome entry");
            }
            !is_outcome
        })
        .filter_map(|entry| entry.resource.as_ref())
        .collect()
}

/// All Observations on the first page, in server order.
pub fn observations_from(pages: &[Bundle]) -> Vec<Observation> {
    resources_from(pages)
        .into_iter()
        .filter(|resource| {
            resource.get("resourceType").and_then(Value::as_str) == Some(OBSERVATION)
        })
        .filter_map(|resource| match Observation::from_value(resource) {
            Ok(observation) => Some(observation),
            Err(e) => {
                let id = resource.get("id").and_then(Value::as_str).unwrap_or("<none>");
                tracing::warn!(id, error = %e, "Skipping unreadable Observation");
                None
            }
        })
        .collect()
}

/// First Observation on the first page, or the not-found sentinel for `code`.
pub fn first_observation(pages: &[Bundle], code: &str) -> ObservationLookup {
    match observations_from(pages).into_iter().next() {
        Some(observation) => ObservationLookup::Found(Box::new(observation)),
        None => ObservationLookup::NotFound(NotFound::new(code)),
    }
}

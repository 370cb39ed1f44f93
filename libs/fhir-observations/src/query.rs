//! Observation search query construction
//!
//! Every retrieval goes through [`QueryBuilder::build`], which turns a
//! [`SearchCriteria`] into the relative search URL sent to the patient
//! session, e.g. `Observation?code=http://loinc.org|8867-4&_sort=-date&_count=1`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coding system prefixed to every code-based search.
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// `_count` used when the caller gives no (or a zero) maximum.
pub const DEFAULT_MAX_RESULTS: u32 = 100;

/// Logical mode used for single lookups, value-set lookups and as the fallback.
pub const DEFAULT_MODE: &str = "code";

/// Sort order on the `date` search parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Value of the `_sort` parameter
    pub fn sort_token(self) -> &'static str {
        match self {
            SortDirection::Ascending => "date",
            SortDirection::Descending => "-date",
        }
    }
}

/// Immutable mapping from logical search mode to FHIR search parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchModeParameters {
    parameters: HashMap<String, String>,
    fallback: String,
}

impl SearchModeParameters {
    /// Build the table. The `code` entry (or the literal `code` when absent)
    /// is used for modes that are not in the table.
    pub fn new(parameters: HashMap<String, String>) -> Self {
        let fallback = parameters
            .get(DEFAULT_MODE)
            .cloned()
            .unwrap_or_else(|| DEFAULT_MODE.to_string());
        Self {
            parameters,
            fallback,
        }
    }

    /// Search parameter for `mode`, falling back to the code parameter.
    pub fn parameter(&self, mode: &str) -> &str {
        self.parameters
            .get(mode)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    /// Search parameter used for plain code lookups
    pub fn code_parameter(&self) -> &str {
        &self.fallback
    }
}

impl Default for SearchModeParameters {
    fn default() -> Self {
        Self::new(default_mode_map())
    }
}

pub(crate) fn default_mode_map() -> HashMap<String, String> {
    [
        ("code", "code"),
        ("combo", "combo-code"),
        ("component", "component-code"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// What to search for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Most recent Observation with this LOINC code
    LatestByCode { code: String },
    /// Observations with this LOINC code, searched through the given mode
    Code { code: String, mode: String },
    /// Observations with any code of the value set
    ValueSet { value_set_id: String },
    /// Observations in a category (raw token, no coding system)
    Category { category: String },
}

/// Criterion plus ordering and size limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub criterion: Criterion,
    pub sort: SortDirection,
    pub max_results: Option<u32>,
}

impl SearchCriteria {
    /// Single most recent result: always `-date` and `_count=1`.
    pub fn latest(code: impl Into<String>) -> Self {
        Self {
            criterion: Criterion::LatestByCode { code: code.into() },
            sort: SortDirection::Descending,
            max_results: Some(1),
        }
    }

    pub fn by_code(code: impl Into<String>, mode: impl Into<String>) -> Self {
        Self::new(Criterion::Code {
            code: code.into(),
            mode: mode.into(),
        })
    }

    pub fn by_value_set(value_set_id: impl Into<String>) -> Self {
        Self::new(Criterion::ValueSet {
            value_set_id: value_set_id.into(),
        })
    }

    pub fn by_category(category: impl Into<String>) -> Self {
        Self::new(Criterion::Category {
            category: category.into(),
        })
    }

    fn new(criterion: Criterion) -> Self {
        Self {
            criterion,
            sort: SortDirection::default(),
            max_results: None,
        }
    }

    /// Set the sort order; `None` keeps the current one.
    pub fn with_sort(mut self, sort: Option<SortDirection>) -> Self {
        if let Some(sort) = sort {
            self.sort = sort;
        }
        self
    }

    pub fn with_max_results(mut self, max_results: Option<u32>) -> Self {
        self.max_results = max_results;
        self
    }
}

/// Builds relative Observation search URLs.
///
/// Caller-supplied tokens (codes, category) are percent-encoded; the
/// `http://loinc.org|` prefix and the parameter names are not.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    modes: &'a SearchModeParameters,
    default_max_results: u32,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(modes: &'a SearchModeParameters) -> Self {
        Self {
            modes,
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_default_max_results(mut self, max: u32) -> Self {
        if max > 0 {
            self.default_max_results = max;
        }
        self
    }

    /// Build the query. `value_set_codes` is only read for [`Criterion::ValueSet`].
    pub fn build(&self, criteria: &SearchCriteria, value_set_codes: &[String]) -> String {
        let predicate = match &criteria.criterion {
            Criterion::LatestByCode { code } => {
                return format!(
                    "Observation?{}={}|{}&_sort={}&_count=1",
                    self.modes.code_parameter(),
                    LOINC_SYSTEM,
                    urlencoding::encode(code),
                    SortDirection::Descending.sort_token(),
                );
            }
            Criterion::Code { code, mode } => format!(
                "{}={}|{}",
                self.modes.parameter(mode),
                LOINC_SYSTEM,
                urlencoding::encode(code)
            ),
            Criterion::ValueSet { .. } => {
                let codes: Vec<_> = value_set_codes
                    .iter()
                    .map(|c| urlencoding::encode(c))
                    .collect();
                format!("{}={}", self.modes.code_parameter(), codes.join(","))
            }
            Criterion::Category { category } => {
                format!("category={}", urlencoding::encode(category))
            }
        };

        format!(
            "Observation?{}&_sort={}&_count={}",
            predicate,
            criteria.sort.sort_token(),
            self.count(criteria)
        )
    }

    fn count(&self, criteria: &SearchCriteria) -> u32 {
        criteria
            .max_results
            .filter(|max| *max > 0)
            .unwrap_or(self.default_max_results)
    }
}

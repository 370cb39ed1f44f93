//! Observation retrieval for the current patient session

use crate::config::ObservationsConfig;
use crate::error::Result;
use crate::http::HttpSession;
use crate::models::{Bundle, Observation, ObservationLookup};
use crate::normalize::{first_observation, observations_from};
use crate::query::{
    Criterion, QueryBuilder, SearchCriteria, SearchModeParameters, SortDirection,
    DEFAULT_MAX_RESULTS,
};
use crate::session::{RequestOptions, SessionProvider, StaticSessionProvider};
use crate::terminology::ValueSetExpander;
use std::sync::Arc;

/// Runs Observation searches against the patient session.
///
/// Each operation waits for the session, builds one query, performs one
/// request and normalizes the first result page. Nothing is cached or retried.
pub struct ObservationClient {
    sessions: Arc<dyn SessionProvider>,
    value_sets: Arc<dyn ValueSetExpander>,
    modes: SearchModeParameters,
    default_max_results: u32,
}

impl ObservationClient {
    pub fn new(sessions: Arc<dyn SessionProvider>, value_sets: Arc<dyn ValueSetExpander>) -> Self {
        Self {
            sessions,
            value_sets,
            modes: SearchModeParameters::default(),
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// HTTP-backed client for the server and patient named in `config`
    pub fn from_config(
        config: &ObservationsConfig,
        value_sets: Arc<dyn ValueSetExpander>,
    ) -> Result<Self> {
        config.validate()?;
        let session = HttpSession::from_config(&config.server)?;
        let sessions = Arc::new(StaticSessionProvider::new(Arc::new(session)));

        Ok(Self::new(sessions, value_sets)
            .with_search_modes(config.search_modes())
            .with_default_max_results(config.search.default_max_results))
    }

    pub fn with_search_modes(mut self, modes: SearchModeParameters) -> Self {
        self.modes = modes;
        self
    }

    pub fn with_default_max_results(mut self, max: u32) -> Self {
        if max > 0 {
            self.default_max_results = max;
        }
        self
    }

    pub fn search_modes(&self) -> &SearchModeParameters {
        &self.modes
    }

    /// Most recent Observation with a LOINC code, or the not-found sentinel.
    #[tracing::instrument(skip(self))]
    pub async fn get_observation(&self, code: &str) -> Result<ObservationLookup> {
        let pages = self.fetch(&SearchCriteria::latest(code)).await?;
        let lookup = first_observation(&pages, code);
        tracing::debug!(found = lookup.is_found(), "Latest observation lookup");
        Ok(lookup)
    }

    /// Observations with a LOINC code, searched through the parameter mapped to `mode`.
    #[tracing::instrument(skip(self))]
    pub async fn get_observations(
        &self,
        code: &str,
        mode: &str,
        sort: Option<SortDirection>,
        max_results: Option<u32>,
    ) -> Result<Vec<Observation>> {
        let criteria = SearchCriteria::by_code(code, mode)
            .with_sort(sort)
            .with_max_results(max_results);
        self.search(&criteria).await
    }

    /// Observations with any code of a value set.
    #[tracing::instrument(skip(self))]
    pub async fn get_observations_by_value_set(
        &self,
        value_set_id: &str,
        sort: Option<SortDirection>,
        max_results: Option<u32>,
    ) -> Result<Vec<Observation>> {
        let criteria = SearchCriteria::by_value_set(value_set_id)
            .with_sort(sort)
            .with_max_results(max_results);
        self.search(&criteria).await
    }

    /// Observations in a category such as `vital-signs` or `laboratory`.
    #[tracing::instrument(skip(self))]
    pub async fn get_observations_by_category(
        &self,
        category: &str,
        sort: Option<SortDirection>,
        max_results: Option<u32>,
    ) -> Result<Vec<Observation>> {
        let criteria = SearchCriteria::by_category(category)
            .with_sort(sort)
            .with_max_results(max_results);
        self.search(&criteria).await
    }

    /// Every Observation on the first result page; empty when nothing matched.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Observation>> {
        let pages = self.fetch(criteria).await?;
        let observations = observations_from(&pages);
        tracing::debug!(count = observations.len(), "Observations normalized");
        Ok(observations)
    }

    /// Build the query for `criteria` and run it on the ready session.
    async fn fetch(&self, criteria: &SearchCriteria) -> Result<Vec<Bundle>> {
        let session = self.sessions.ready().await?;

        let value_set_codes = match &criteria.criterion {
            Criterion::ValueSet { value_set_id } => {
                self.value_sets.get_all_codes(value_set_id).await?
            }
            _ => Vec::new(),
        };

        let query = QueryBuilder::new(&self.modes)
            .with_default_max_results(self.default_max_results)
            .build(criteria, &value_set_codes);
        tracing::debug!(query = %query, "Searching observations");

        session.request(&query, &RequestOptions::unlimited()).await
    }
}

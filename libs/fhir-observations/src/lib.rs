//! FHIR Observation queries
//!
//! This crate retrieves Observation resources for the patient of an
//! authenticated SMART session and collapses each Observation's `value[x]`
//! into a single [`ExtractedValue`].
//!
//! Four lookups are available on [`ObservationClient`]:
//!
//! - latest Observation for a LOINC code (falls back to a not-found sentinel)
//! - all Observations for a LOINC code
//! - all Observations for any code of a value set
//! - all Observations of a category
//!
//! # Example
//!
//! ```rust,no_run
//! use ferrum_observations::{
//!     get_value, HttpSession, ObservationClient, SortDirection, StaticSessionProvider,
//!     ValueSetCatalog,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = HttpSession::new("https://launch.smarthealthit.org/v/r4/fhir")?
//!     .with_access_token("token")
//!     .with_patient("smart-1288992");
//! let client = ObservationClient::new(
//!     Arc::new(StaticSessionProvider::new(Arc::new(session))),
//!     Arc::new(ValueSetCatalog::new()),
//! );
//!
//! if let Some(heart_rate) = client.get_observation("8867-4").await?.observation() {
//!     println!("{:?}", get_value(heart_rate));
//! }
//!
//! let vitals = client
//!     .get_observations_by_category("vital-signs", Some(SortDirection::Descending), Some(10))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod normalize;
pub mod query;
pub mod session;
pub mod terminology;

pub use client::ObservationClient;
pub use config::ObservationsConfig;
pub use error::{Error, Result};
pub use http::HttpSession;
pub use models::{get_value, ExtractedValue, NotFound, Observation, ObservationLookup};
pub use query::{Criterion, SearchCriteria, SearchModeParameters, SortDirection};
pub use session::{PatientSession, RequestOptions, SessionProvider, StaticSessionProvider};
pub use terminology::{ValueSetCatalog, ValueSetExpander};

//! Data models for observation search results

pub mod bundle;
pub mod datatypes;
pub mod observation;
pub mod value;

pub use bundle::*;
pub use datatypes::*;
pub use observation::*;
pub use value::*;

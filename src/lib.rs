//! Protoclust: mixed-type clustering with the K-Prototypes algorithm
//!
//! This library clusters records that carry both continuous and categorical
//! attributes. Continuous features are compared with Euclidean distance and
//! summarized by their mean; categorical features are compared by mismatch
//! counting and summarized by their mode. One weighted formula blends the two,
//! and the classical K-Means and K-Modes algorithms fall out as the two
//! single-weight special cases.

pub mod cli;
pub mod data;
pub mod error;
pub mod model;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_mixed_data, MinMaxScaler, MixedData};
pub use error::ClusterError;
pub use model::{calinski_harabasz, fit_kprototypes, KPrototypesModel, Mode};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

//! Typed failure kinds for the clustering core

use thiserror::Error;

/// Errors surfaced by dataset construction and the clustering run.
///
/// Structural kinds (`InvalidSchema`, `InsufficientRecords`,
/// `InvalidModeConfiguration`) are raised before any iteration starts;
/// the remaining kinds abort a run mid-loop. No retries happen internally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("cannot sample {requested} initial centers from {available} records")]
    InsufficientRecords { requested: usize, available: usize },

    #[error("unrecognized clustering mode: '{0}' (expected numeric, categorical, or blended)")]
    InvalidModeConfiguration(String),

    #[error("record {record} is at zero distance to every center in one distance component")]
    DegenerateDistanceSum { record: usize },

    #[error("cluster {cluster} lost all members at iteration {iteration}")]
    EmptyCluster { cluster: usize, iteration: usize },
}

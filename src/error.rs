//! Error types for the acoustic ray-tracing core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuralTraceError {
    /// A triangle was degenerate (zero area) or carried a NaN vertex.
    /// Non-fatal: the face is treated as never-hit and build continues.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A BVH build was cancelled before completion. The caller must
    /// discard the half-built structure; no partial BVH is ever exposed.
    #[error("BVH build cancelled")]
    BuildCancelled,

    /// A scheduled task reported cancellation mid-run. Not returned from
    /// normal task bodies; aggregators instead read a per-task
    /// `cancelled` flag and fold it into a degraded result.
    #[error("task cancelled: {0}")]
    TaskCancelled(String),

    /// A result vector failed to grow. Fatal to the probe that hit it;
    /// the aggregator marks its result degraded and returns.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Failure submitting to or joining a `TaskScheduler`.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Configuration values outside their valid range.
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, AuralTraceError>;

// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// simnet: a parallel stochastic simulator for networked CTMC population models.
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! Error taxonomy for the simnet solver.
//!
//! Every fatal condition the solver can hit is one variant of [`SimError`],
//! carrying whatever node/transition/rate context is available at the
//! failure site. There are no retries: the day loop aborts at the next
//! barrier and the driver returns the first observed error.

use thiserror::Error;

/// Stable error code, for parity with a host that marshals errors across
/// an FFI boundary by integer/string code rather than by Rust type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A compartment would have gone negative.
    NegativeState,
    /// A buffer could not be sized without risking an allocator abort.
    AllocMemoryBuffer,
    /// `Nthread < 1`.
    UnsupportedParallelization,
    /// An event carried an `event_kind` outside `{EXIT, ENTER, INTERNAL_TRANSFER, EXTERNAL_TRANSFER}`.
    UndefinedEvent,
    /// `sample_select` was asked for an infeasible draw.
    SampleSelect,
    /// A propensity returned NaN, an infinity, or a negative rate.
    InvalidRate,
    /// A sparse matrix or other solver input failed structural validation.
    InvalidConfiguration,
}

/// Fatal error raised by any phase of the solver.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Applying a transition's stoichiometry, or a scheduled event, would
    /// have driven a compartment negative.
    #[error("node {node}: compartment {compartment} would go negative ({value})")]
    NegativeState {
        /// Node index.
        node: usize,
        /// Compartment index within the node.
        compartment: usize,
        /// The value that would have resulted.
        value: i64,
    },

    /// A propensity callback returned a non-finite or negative rate.
    #[error("node {node}: transition {transition} returned an invalid rate ({rate})")]
    InvalidRate {
        /// Node index.
        node: usize,
        /// Transition index.
        transition: usize,
        /// The offending rate.
        rate: f64,
    },

    /// A scheduled event carried an unrecognized `event_kind`.
    #[error("scheduled event {index}: undefined event kind {kind}")]
    UndefinedEvent {
        /// Index of the event in the input stream.
        index: usize,
        /// The raw (unrecognized) event kind value.
        kind: i32,
    },

    /// `sample_select` was asked to draw an infeasible or malformed sample.
    #[error(
        "node {node}: cannot sample {requested} individuals from select column {select} \
         ({available} available)"
    )]
    SampleSelect {
        /// Node index.
        node: usize,
        /// Select-matrix column index.
        select: usize,
        /// Individuals requested.
        requested: i64,
        /// Individuals actually available across the selected compartments.
        available: i64,
    },

    /// A buffer size was rejected before allocation to avoid an allocator
    /// abort (the Rust analogue of the original's out-of-memory code).
    #[error("refusing to allocate {what} ({requested} elements)")]
    AllocMemoryBuffer {
        /// What was being allocated.
        what: &'static str,
        /// The rejected element count.
        requested: usize,
    },

    /// `Nthread < 1`, or the configured parallelism is otherwise unusable.
    #[error("unsupported parallelization: Nthread = {nthread}")]
    UnsupportedParallelization {
        /// The rejected thread count.
        nthread: usize,
    },

    /// A sparse matrix, shift matrix, or other solver input failed
    /// structural validation at construction time.
    #[error("invalid solver configuration: {0}")]
    InvalidConfiguration(String),

    /// A model's post-step callback reported a fatal condition of its own.
    #[error("node {node}: post-step callback returned fatal code {code}")]
    ModelError {
        /// Node index.
        node: usize,
        /// The negative return code from the callback.
        code: i32,
    },
}

impl SimError {
    /// The stable [`ErrorCode`] for this error, independent of the
    /// human-readable context carried alongside it.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            SimError::NegativeState { .. } => ErrorCode::NegativeState,
            SimError::InvalidRate { .. } => ErrorCode::InvalidRate,
            SimError::UndefinedEvent { .. } => ErrorCode::UndefinedEvent,
            SimError::SampleSelect { .. } => ErrorCode::SampleSelect,
            SimError::AllocMemoryBuffer { .. } => ErrorCode::AllocMemoryBuffer,
            SimError::UnsupportedParallelization { .. } => ErrorCode::UnsupportedParallelization,
            SimError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            SimError::ModelError { .. } => ErrorCode::InvalidConfiguration,
        }
    }
}

/// Convenience alias used throughout the solver crates.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_matches_variant() {
        let e = SimError::NegativeState {
            node: 0,
            compartment: 1,
            value: -3,
        };
        assert_eq!(e.code(), ErrorCode::NegativeState);
    }

    #[test]
    fn display_carries_context() {
        let e = SimError::SampleSelect {
            node: 2,
            select: 0,
            requested: 100,
            available: 50,
        };
        let msg = e.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }
}

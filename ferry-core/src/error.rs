//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// The first three variants are admission-control conditions. They are
/// recoverable by waiting or retrying and never indicate lost data.
/// The remaining variants are programmer or configuration errors, or report
/// that a shared resource was closed during shutdown.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FerryError {
    /// An insert was refused by the rate limiter of the table.
    #[error("insert into table `{table}` refused by the rate limiter")]
    CapacityRateLimited {
        /// Name of the table.
        table: String,
    },

    /// A sample was attempted before the table could serve it.
    #[error("table `{table}` cannot be sampled yet (size {size}, min_size {min_size})")]
    InsufficientData {
        /// Name of the table.
        table: String,

        /// Number of items in the table when the sample was attempted.
        size: usize,

        /// Minimum number of items required before sampling.
        min_size: usize,
    },

    /// An adder could not place its items into the table.
    #[error("adder could not place items into table `{table}`")]
    AdderBackpressure {
        /// Name of the table.
        table: String,
    },

    /// The trajectory protocol of an adder was violated.
    #[error("invalid trajectory state: {0}")]
    InvalidTrajectoryState(String),

    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The shape of an observation or action differs from the table signature.
    #[error("shape of {field} does not match the signature: expected {expected:?}, got {actual:?}")]
    SignatureMismatch {
        /// `"observation"` or `"action"`.
        field: String,

        /// Shape in the signature.
        expected: Vec<usize>,

        /// Shape of the offending value.
        actual: Vec<usize>,
    },

    /// No table is registered under the given name.
    #[error("table `{0}` not found")]
    TableNotFound(String),

    /// An actor was asked to act before any parameters were published.
    #[error("no parameters have been published yet")]
    ParamsNotSynced,

    /// A batched policy returned an unexpected number of actions.
    #[error("policy returned {0} actions for a single observation")]
    PolicyOutput(usize),

    /// A blocking call was released because the named resource was closed.
    #[error("{0} was closed")]
    Cancelled(String),

    /// Record key error.
    #[error("record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("record value type error: {0}")]
    RecordValueTypeError(String),
}

impl FerryError {
    /// Returns `true` for admission-control conditions, which callers resolve
    /// by waiting or retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FerryError::CapacityRateLimited { .. }
                | FerryError::InsufficientData { .. }
                | FerryError::AdderBackpressure { .. }
        )
    }

    /// Returns `true` if a blocking call was released by shutdown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FerryError::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::FerryError;

    #[test]
    fn test_recoverable_kinds() {
        let table = "replay".to_string();
        assert!(FerryError::CapacityRateLimited { table: table.clone() }.is_recoverable());
        assert!(FerryError::AdderBackpressure { table: table.clone() }.is_recoverable());
        assert!(FerryError::InsufficientData {
            table,
            size: 1,
            min_size: 4
        }
        .is_recoverable());
        assert!(!FerryError::InvalidTrajectoryState("x".into()).is_recoverable());
        assert!(!FerryError::InvalidConfig("x".into()).is_recoverable());
        assert!(FerryError::Cancelled("table".into()).is_cancelled());
    }
}

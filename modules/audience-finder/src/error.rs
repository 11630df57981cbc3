use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

/// Terminal reasons a scan is refused or aborted. Per-call strategy failures
/// never surface here; they are logged and counted in `ScanStats`.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("No usable search queries: enter at least one non-empty line")]
    EmptyInput,

    #[error(
        "Estimated workload {cost} exceeds the ceiling of {ceiling}; \
         reduce the number of queries or the search depths"
    )]
    WorkloadExceeded { cost: f64, ceiling: f64 },

    #[error("Reddit rejected the API handle: {0}")]
    UpstreamAuth(String),

    #[error("A scan is already running on this controller")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workload_message_names_cost_and_ceiling() {
        let msg = ScanError::WorkloadExceeded {
            cost: 30000.0,
            ceiling: 5000.0,
        }
        .to_string();
        assert!(msg.contains("30000"), "{msg}");
        assert!(msg.contains("5000"), "{msg}");
    }

    #[test]
    fn workload_message_keeps_fractions() {
        let msg = ScanError::WorkloadExceeded {
            cost: 5000.1,
            ceiling: 5000.0,
        }
        .to_string();
        assert!(msg.contains("5000.1 exceeds the ceiling of 5000;"), "{msg}");

        let msg = ScanError::WorkloadExceeded {
            cost: 10.0,
            ceiling: 7.5,
        }
        .to_string();
        assert!(msg.contains("ceiling of 7.5"), "{msg}");
    }
}

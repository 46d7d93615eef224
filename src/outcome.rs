use crate::error::{LabError, Result};
use serde::Serialize;
use std::fmt::Display;
use tracing::{error, info};

/// What happened to one store during a multi-store operation.
#[derive(Debug, Clone, Serialize)]
pub struct StoreOutcome {
    pub store: &'static str,
    pub succeeded: bool,
    pub detail: String,
}

impl StoreOutcome {
    /// Log the result for `store` and turn it into an outcome, so the caller can move on
    /// to the next store whatever happened.
    pub fn record<T: Display>(store: &'static str, result: Result<T>) -> Self {
        match result {
            Ok(value) => {
                info!("  {}: {}", store, value);
                Self {
                    store,
                    succeeded: true,
                    detail: value.to_string(),
                }
            }
            Err(e) => {
                error!("  {} ERROR: {}", store, e);
                Self {
                    store,
                    succeeded: false,
                    detail: e.to_string(),
                }
            }
        }
    }
}

pub fn all_succeeded(outcomes: &[StoreOutcome]) -> bool {
    outcomes.iter().all(|o| o.succeeded)
}

/// Fail with the list of stores that did not succeed, if any.
pub fn ensure_all_succeeded(operation: &str, outcomes: &[StoreOutcome]) -> Result<()> {
    if all_succeeded(outcomes) {
        return Ok(());
    }

    let failed: Vec<&str> = outcomes.iter().filter(|o| !o.succeeded).map(|o| o.store).collect();
    Err(LabError::Internal(format!("{} failed in {}", operation, failed.join(", "))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_going_after_failures() {
        let outcomes = vec![
            StoreOutcome::record("MySQL", Ok::<_, LabError>("structure created")),
            StoreOutcome::record::<&str>("PostgreSQL", Err(LabError::connection("PostgreSQL", "refused"))),
            StoreOutcome::record("MongoDB", Ok::<_, LabError>(4)),
        ];

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].succeeded);
        assert!(!outcomes[1].succeeded);
        assert!(outcomes[1].detail.contains("refused"));
        assert_eq!(outcomes[2].detail, "4");
        assert!(!all_succeeded(&outcomes));
    }

    #[test]
    fn test_ensure_all_succeeded_names_failed_stores() {
        let outcomes = vec![
            StoreOutcome::record("MySQL", Ok::<_, LabError>("ok")),
            StoreOutcome::record::<&str>("MongoDB", Err(LabError::connection("MongoDB", "timeout"))),
        ];

        let err = ensure_all_succeeded("reset", &outcomes).unwrap_err();
        assert_eq!(err.to_string(), "Internal error: reset failed in MongoDB");

        assert!(ensure_all_succeeded("reset", &outcomes[..1]).is_ok());
    }
}

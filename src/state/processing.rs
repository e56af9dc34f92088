/// Per-panel state for long-running operations (AI edits, uploads).
///
/// A panel runs at most one operation at a time:
/// `Idle -> Processing -> Success | Error`. Starting a new operation from
/// `Success` or `Error` is allowed (that is how a user retries); starting
/// one while `Processing` is refused.

use std::future::Future;

use crate::error::{Result, StudioError};

/// Error message left on a panel whose job was dropped
pub const CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessingState {
    #[default]
    Idle,
    Processing {
        operation: String,
    },
    Success,
    /// Terminal failure with a message for the user
    Error(String),
}

impl ProcessingState {
    pub fn is_processing(&self) -> bool {
        matches!(self, ProcessingState::Processing { .. })
    }
}

#[derive(Debug, Default)]
pub struct ProcessingPanel {
    state: ProcessingState,
}

impl ProcessingPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    /// Enter `Processing`, unless an operation is already in flight
    pub fn begin(&mut self, operation: &str) -> Result<()> {
        if self.state.is_processing() {
            tracing::warn!(operation, "Refusing to start: panel busy");
            return Err(StudioError::Busy);
        }
        self.state = ProcessingState::Processing {
            operation: operation.to_string(),
        };
        Ok(())
    }

    pub fn succeed(&mut self) {
        self.state = ProcessingState::Success;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = ProcessingState::Error(message.into());
    }

    pub fn reset(&mut self) {
        self.state = ProcessingState::Idle;
    }

    /// Run `job` through the state machine and hand back its result
    ///
    /// If the returned future is dropped before `job` finishes, the panel
    /// moves to `Error("cancelled")` so the user can start again.
    pub async fn run<T, F>(&mut self, operation: &str, job: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.begin(operation)?;
        let in_flight = InFlight {
            state: &mut self.state,
        };
        match job.await {
            Ok(value) => {
                *in_flight.state = ProcessingState::Success;
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "Operation failed");
                *in_flight.state = ProcessingState::Error(e.to_string());
                Err(e)
            }
        }
    }
}

/// Leaves `Processing` when a job is abandoned mid-flight
struct InFlight<'a> {
    state: &'a mut ProcessingState,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.state.is_processing() {
            tracing::warn!("Operation cancelled");
            *self.state = ProcessingState::Error(CANCELLED.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_while_processing_is_refused() {
        let mut panel = ProcessingPanel::new();
        panel.begin("enhance").unwrap();
        assert!(matches!(panel.begin("enhance"), Err(StudioError::Busy)));
        assert_eq!(
            panel.state(),
            &ProcessingState::Processing { operation: "enhance".into() }
        );
    }

    #[test]
    fn test_retry_after_error() {
        let mut panel = ProcessingPanel::new();
        panel.begin("enhance").unwrap();
        panel.fail("model unavailable");
        assert_eq!(panel.state(), &ProcessingState::Error("model unavailable".into()));

        panel.begin("enhance").unwrap();
        panel.succeed();
        assert_eq!(panel.state(), &ProcessingState::Success);

        panel.reset();
        assert_eq!(panel.state(), &ProcessingState::Idle);
    }

    #[tokio::test]
    async fn test_run_records_outcome() {
        let mut panel = ProcessingPanel::new();
        let value = panel.run("caption", async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(panel.state(), &ProcessingState::Success);

        let result: Result<()> = panel
            .run("caption", async { Err(StudioError::Config("boom".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(panel.state(), &ProcessingState::Error("config error: boom".into()));
    }

    #[tokio::test]
    async fn test_dropped_job_frees_panel() {
        let mut panel = ProcessingPanel::new();
        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            panel.run("enhance", std::future::pending::<Result<()>>()),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(panel.state(), &ProcessingState::Error(CANCELLED.into()));

        let value = panel.run("enhance", async { Ok(1) }).await.unwrap();
        assert_eq!(value, 1);
        assert_eq!(panel.state(), &ProcessingState::Success);
    }
}

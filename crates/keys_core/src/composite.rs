//! Runs several tag operations back to back as one all-or-nothing unit.

use std::sync::Arc;

use shared::protocol::{OperationRequest, OperationResponse};
use tracing::{debug, warn};

use crate::{cancel::CancelScope, error::OperationError, interactor::NfcInteractor};

// Only observable in logs: the builder itself is the `built` state, and
// `execute_all` consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompositeState {
    Running,
    CompletedSuccess,
    CompletedFailure,
}

struct Step {
    interactor: Arc<dyn NfcInteractor>,
    request: OperationRequest,
}

/// Ordered plan of interactor calls.
///
/// Steps can only be added while the plan is being built; `execute_all`
/// consumes it.
#[derive(Default)]
pub struct CompositeOperation {
    steps: Vec<Step>,
}

impl CompositeOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_operation(
        mut self,
        interactor: Arc<dyn NfcInteractor>,
        request: OperationRequest,
    ) -> Self {
        self.steps.push(Step {
            interactor,
            request,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in insertion order and returns their responses in the
    /// same order. Requests without a PIN receive `pin`.
    ///
    /// The first failing step ends the run with its error; later steps never
    /// start. `scope` is checked before each step.
    pub async fn execute_all(
        self,
        pin: &str,
        scope: &CancelScope,
    ) -> Result<Vec<OperationResponse>, OperationError> {
        let total = self.steps.len();
        log_state(CompositeState::Running, total);

        let mut responses = Vec::with_capacity(total);
        for (index, step) in self.steps.into_iter().enumerate() {
            if scope.is_cancelled() {
                log_state(CompositeState::CompletedFailure, total);
                return Err(OperationError::cancelled("composite step"));
            }

            let request = step.request.with_default_pin(pin);
            debug!(
                step = index + 1,
                total,
                interactor = step.interactor.name(),
                request = request.kind(),
                "running composite step"
            );
            match step.interactor.run(request).await {
                Ok(response) => responses.push(response),
                Err(err) => {
                    warn!(
                        step = index + 1,
                        total,
                        interactor = step.interactor.name(),
                        error = %err,
                        "composite step failed"
                    );
                    log_state(CompositeState::CompletedFailure, total);
                    return Err(err);
                }
            }
        }

        log_state(CompositeState::CompletedSuccess, total);
        Ok(responses)
    }
}

fn log_state(state: CompositeState, steps: usize) {
    debug!(?state, steps, "composite operation state");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use shared::{
        domain::{AttributeType, DataFile, TagHandle},
        error::{Reason, TagError},
    };

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<(String, Option<String>)> {
            self.calls.lock().expect("calls").clone()
        }
    }

    struct ScriptedStep {
        label: &'static str,
        fail: bool,
        log: Arc<Recorder>,
    }

    #[async_trait]
    impl NfcInteractor for ScriptedStep {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn run(&self, request: OperationRequest) -> Result<OperationResponse, OperationError> {
            self.log
                .calls
                .lock()
                .expect("calls")
                .push((self.label.to_string(), request.pin().map(str::to_string)));
            if self.fail {
                return Err(TagError::new(Reason::TagLost, format!("{} failed", self.label)).into());
            }
            Ok(OperationResponse::File(DataFile::new(
                self.label,
                AttributeType::String,
                self.label.as_bytes().to_vec(),
            )))
        }
    }

    fn step(label: &'static str, fail: bool, log: &Arc<Recorder>) -> Arc<dyn NfcInteractor> {
        Arc::new(ScriptedStep {
            label,
            fail,
            log: Arc::clone(log),
        })
    }

    fn read(pin: Option<&str>) -> OperationRequest {
        OperationRequest::ReadPayload {
            tag: TagHandle::new(vec![7; 7]),
            pin: pin.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn all_steps_run_in_order_and_last_response_is_last_step() {
        let log = Arc::new(Recorder::default());
        let plan = CompositeOperation::new()
            .add_operation(step("reset", false, &log), read(None))
            .add_operation(step("write", false, &log), read(None))
            .add_operation(step("read", false, &log), read(None));
        assert_eq!(plan.len(), 3);

        let responses = plan
            .execute_all("1234", &CancelScope::new())
            .await
            .expect("composite");

        let order: Vec<_> = log.calls().into_iter().map(|(label, _)| label).collect();
        assert_eq!(order, vec!["reset", "write", "read"]);
        assert_eq!(responses.len(), 3);
        assert!(matches!(
            responses.last(),
            Some(OperationResponse::File(file)) if file.name == "read"
        ));
    }

    #[tokio::test]
    async fn first_failure_stops_remaining_steps() {
        for failing in 1..=4 {
            let log = Arc::new(Recorder::default());
            let mut plan = CompositeOperation::new();
            for index in 1..=4 {
                plan = plan.add_operation(step("step", index == failing, &log), read(None));
            }

            let err = plan
                .execute_all("1234", &CancelScope::new())
                .await
                .expect_err("composite must fail");

            assert_eq!(log.calls().len(), failing);
            assert_eq!(
                err.as_tag_error().and_then(|err| err.reason),
                Some(Reason::TagLost)
            );
        }
    }

    #[tokio::test]
    async fn shared_pin_only_fills_requests_without_one() {
        let log = Arc::new(Recorder::default());
        CompositeOperation::new()
            .add_operation(step("implicit", false, &log), read(None))
            .add_operation(step("explicit", false, &log), read(Some("0000")))
            .execute_all("1234", &CancelScope::new())
            .await
            .expect("composite");

        assert_eq!(
            log.calls(),
            vec![
                ("implicit".to_string(), Some("1234".to_string())),
                ("explicit".to_string(), Some("0000".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_scope_prevents_any_step() {
        let log = Arc::new(Recorder::default());
        let scope = CancelScope::new();
        scope.cancel();

        let err = CompositeOperation::new()
            .add_operation(step("reset", false, &log), read(None))
            .execute_all("1234", &scope)
            .await
            .expect_err("cancelled");

        assert!(matches!(err, OperationError::Cancelled { .. }));
        assert!(log.calls().is_empty());
    }

    struct CancellingStep {
        scope: CancelScope,
        log: Arc<Recorder>,
    }

    #[async_trait]
    impl NfcInteractor for CancellingStep {
        fn name(&self) -> &'static str {
            "cancelling"
        }

        async fn run(&self, request: OperationRequest) -> Result<OperationResponse, OperationError> {
            self.log
                .calls
                .lock()
                .expect("calls")
                .push(("cancelling".to_string(), request.pin().map(str::to_string)));
            self.scope.cancel();
            Ok(OperationResponse::Done)
        }
    }

    #[tokio::test]
    async fn cancel_during_a_step_stops_before_the_next_one() {
        let log = Arc::new(Recorder::default());
        let scope = CancelScope::new();
        let first: Arc<dyn NfcInteractor> = Arc::new(CancellingStep {
            scope: scope.clone(),
            log: Arc::clone(&log),
        });

        let err = CompositeOperation::new()
            .add_operation(first, read(None))
            .add_operation(step("write", false, &log), read(None))
            .add_operation(step("read", false, &log), read(None))
            .execute_all("1234", &scope)
            .await
            .expect_err("cancelled mid-run");

        assert!(matches!(err, OperationError::Cancelled { .. }));
        assert_eq!(
            log.calls(),
            vec![("cancelling".to_string(), Some("1234".to_string()))]
        );
    }

    #[tokio::test]
    async fn empty_plan_succeeds_without_responses() {
        let plan = CompositeOperation::new();
        assert!(plan.is_empty());
        let responses = plan
            .execute_all("1234", &CancelScope::new())
            .await
            .expect("empty plan");
        assert!(responses.is_empty());
    }
}

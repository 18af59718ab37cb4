use std::sync::Arc;

use async_trait::async_trait;
use shared::protocol::{OperationRequest, OperationResponse};

use crate::error::OperationError;

/// One tag operation exposed by the tag toolkit.
#[async_trait]
pub trait NfcInteractor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, request: OperationRequest) -> Result<OperationResponse, OperationError>;
}

/// The interactors a presenter drives, one per single operation.
#[derive(Clone)]
pub struct Interactors {
    pub read_chip_info: Arc<dyn NfcInteractor>,
    pub read_payload: Arc<dyn NfcInteractor>,
    pub write_payload: Arc<dyn NfcInteractor>,
    pub reset: Arc<dyn NfcInteractor>,
    pub read_file: Arc<dyn NfcInteractor>,
    pub write_file: Arc<dyn NfcInteractor>,
}

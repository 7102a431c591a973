//! Connection provisioning. A connection is owned by one operation and released on drop.

use crate::error::DataError;
use crate::repository::procedure::{ProcedureCall, ProcedureOutput};
use async_trait::async_trait;

/// Opens connections for single operations. Open failures are returned as-is; no retry.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Connection: ProcedureConnection;

    async fn open(&self) -> Result<Self::Connection, DataError>;
}

/// An open connection able to run one procedure call at a time.
#[async_trait]
pub trait ProcedureConnection: Send {
    async fn call(&mut self, call: &ProcedureCall) -> Result<ProcedureOutput, DataError>;
}

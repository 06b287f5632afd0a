//! Save / erase / query submissions against anchor storage.
//!
//! Nothing here waits for a result. Each call hands the request to the runtime,
//! registers it in the [`RequestTable`], and returns; outcomes arrive later as
//! events and are handled by the dispatcher.

use tether_types::{
    EngineError, EraseInfo, OperationKind, PersistenceMode, QueryAction, QueryInfo, RequestId,
    ResultCode, SaveInfo, SpaceHandle, StorageLocation,
};

use crate::config::EngineConfig;
use crate::requests::{Continuation, PendingRequest, RequestTable};
use crate::runtime::SpatialRuntime;

/// Register a submission result with the table, logging failures uniformly.
pub(crate) fn track(
    requests: &mut RequestTable,
    submitted: Result<RequestId, ResultCode>,
    pending: PendingRequest,
) -> Result<RequestId, EngineError> {
    let kind = pending.kind();
    let request_id = match submitted {
        Ok(id) => id,
        Err(ResultCode::ComponentStatusAlreadySet) => {
            tracing::debug!(operation = %kind, "Component already in requested state");
            return Err(EngineError::ComponentStatusAlreadySet);
        }
        Err(code) => {
            tracing::error!(operation = %kind, result = %code, "Runtime rejected submission");
            return Err(code.into());
        }
    };
    if let Err(e) = requests.register(request_id, pending) {
        tracing::error!(operation = %kind, request_id = %request_id, "Runtime reused an in-flight request id");
        return Err(e);
    }
    tracing::debug!(operation = %kind, request_id = %request_id, "Submitted");
    Ok(request_id)
}

#[derive(Debug, Clone)]
pub struct PersistenceCoordinator {
    location: StorageLocation,
    persistence_mode: PersistenceMode,
    query_max_results: u32,
    query_timeout_ns: i64,
}

impl PersistenceCoordinator {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            location: config.storage_location,
            persistence_mode: config.persistence_mode,
            query_max_results: config.query_max_results,
            query_timeout_ns: config.query_timeout_ns,
        }
    }

    #[must_use]
    pub fn location(&self) -> StorageLocation {
        self.location
    }

    #[must_use]
    pub fn save_info(&self, space: SpaceHandle) -> SaveInfo {
        SaveInfo {
            space,
            location: self.location,
            persistence_mode: self.persistence_mode,
        }
    }

    #[must_use]
    pub fn erase_info(&self, space: SpaceHandle) -> EraseInfo {
        EraseInfo {
            space,
            location: self.location,
        }
    }

    #[must_use]
    pub fn query_info(&self) -> QueryInfo {
        QueryInfo {
            action: QueryAction::Load,
            max_result_count: self.query_max_results,
            timeout: self.query_timeout_ns,
            location_filter: None,
        }
    }

    pub fn save<R: SpatialRuntime + ?Sized>(
        &self,
        runtime: &mut R,
        requests: &mut RequestTable,
        space: SpaceHandle,
        continuation: Continuation,
        tick: u64,
    ) -> Result<RequestId, EngineError> {
        let submitted = runtime.save_space(&self.save_info(space));
        let pending =
            PendingRequest::new(OperationKind::Save, continuation, tick).with_subject(space);
        track(requests, submitted, pending)
    }

    pub fn erase<R: SpatialRuntime + ?Sized>(
        &self,
        runtime: &mut R,
        requests: &mut RequestTable,
        space: SpaceHandle,
        continuation: Continuation,
        tick: u64,
    ) -> Result<RequestId, EngineError> {
        let submitted = runtime.erase_space(&self.erase_info(space));
        let pending =
            PendingRequest::new(OperationKind::Erase, continuation, tick).with_subject(space);
        track(requests, submitted, pending)
    }

    /// Start a load query. Results surface later through the dispatcher.
    pub fn load_all<R: SpatialRuntime + ?Sized>(
        &self,
        runtime: &mut R,
        requests: &mut RequestTable,
        continuation: Continuation,
        tick: u64,
    ) -> Result<RequestId, EngineError> {
        let submitted = runtime.query_spaces(&self.query_info());
        let pending = PendingRequest::new(OperationKind::Query, continuation, tick);
        track(requests, submitted, pending)
    }
}

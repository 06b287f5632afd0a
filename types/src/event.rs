//! Completion events delivered by the runtime, already unmarshaled.

use std::fmt;

use crate::{AnchorId, ComponentType, ResultCode, RequestId, SpaceHandle, StorageLocation};

/// Kind of asynchronous operation a request id was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    SetComponent,
    Save,
    Erase,
    Query,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::SetComponent => "set_component",
            Self::Save => "save",
            Self::Erase => "erase",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An out-of-band event from the runtime's event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpatialEvent {
    CreateComplete {
        request_id: RequestId,
        result: ResultCode,
        space: SpaceHandle,
        uuid: AnchorId,
    },
    ComponentStatusComplete {
        request_id: RequestId,
        result: ResultCode,
        space: SpaceHandle,
        uuid: AnchorId,
        component: ComponentType,
        enabled: bool,
    },
    SaveComplete {
        request_id: RequestId,
        result: ResultCode,
        space: SpaceHandle,
        uuid: AnchorId,
        location: StorageLocation,
    },
    EraseComplete {
        request_id: RequestId,
        result: ResultCode,
        space: SpaceHandle,
        uuid: AnchorId,
        location: StorageLocation,
    },
    /// Results for a query can now be retrieved with the two-call idiom.
    QueryResultsAvailable { request_id: RequestId },
    /// Terminal marker of a query; no further results follow.
    QueryComplete {
        request_id: RequestId,
        result: ResultCode,
    },
}

impl SpatialEvent {
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::CreateComplete { request_id, .. }
            | Self::ComponentStatusComplete { request_id, .. }
            | Self::SaveComplete { request_id, .. }
            | Self::EraseComplete { request_id, .. }
            | Self::QueryResultsAvailable { request_id }
            | Self::QueryComplete { request_id, .. } => *request_id,
        }
    }

    /// Operation kind this event completes (or reports progress for).
    #[must_use]
    pub const fn operation_kind(&self) -> OperationKind {
        match self {
            Self::CreateComplete { .. } => OperationKind::Create,
            Self::ComponentStatusComplete { .. } => OperationKind::SetComponent,
            Self::SaveComplete { .. } => OperationKind::Save,
            Self::EraseComplete { .. } => OperationKind::Erase,
            Self::QueryResultsAvailable { .. } | Self::QueryComplete { .. } => {
                OperationKind::Query
            }
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateComplete { .. } => "create_complete",
            Self::ComponentStatusComplete { .. } => "component_status_complete",
            Self::SaveComplete { .. } => "save_complete",
            Self::EraseComplete { .. } => "erase_complete",
            Self::QueryResultsAvailable { .. } => "query_results_available",
            Self::QueryComplete { .. } => "query_complete",
        }
    }
}

/// Payload handed to a success continuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Created {
        id: AnchorId,
        space: SpaceHandle,
    },
    ComponentSet {
        id: AnchorId,
        component: ComponentType,
        enabled: bool,
    },
    Saved {
        id: AnchorId,
    },
    Erased {
        id: AnchorId,
    },
    QueryFinished {
        /// Anchors staged for promotion during this query round.
        discovered: usize,
    },
}

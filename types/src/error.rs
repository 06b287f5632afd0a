use std::fmt;

use thiserror::Error;

use crate::{AnchorId, OperationKind, RequestId, ResultCode};

/// Native extensions the engine depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    SpatialEntity,
    Storage,
    Query,
}

impl Extension {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SpatialEntity => "XR_FB_spatial_entity",
            Self::Storage => "XR_FB_spatial_entity_storage",
            Self::Query => "XR_FB_spatial_entity_query",
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything that can go wrong in the anchor lifecycle.
///
/// Synchronous failures are returned from submission calls; asynchronous ones
/// reach the caller only through the failure continuation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("request rejected by runtime validation")]
    ValidationFailure,
    #[error("component not supported by this space")]
    ComponentNotSupported,
    #[error("component not enabled on this space")]
    ComponentNotEnabled,
    #[error("component status change already pending")]
    ComponentStatusPending,
    #[error("component already in the requested state")]
    ComponentStatusAlreadySet,
    #[error("request id {0} is already pending")]
    DuplicateRequest(RequestId),
    #[error("anchor {0} is already registered")]
    DuplicateIdentity(AnchorId),
    #[error("no pending request with id {0}")]
    UnknownRequestId(RequestId),
    #[error("supported component list changed during enumeration")]
    EnumerationUnstable,
    #[error("space could not be located")]
    LocateFailure,
    #[error("spatial anchors are disabled")]
    Disabled,
    #[error("{0} is not available")]
    Unavailable(Extension),
    #[error("anchor {0} is not registered")]
    UnknownAnchor(AnchorId),
    #[error("request {request_id} was submitted as {expected} but completed as {actual}")]
    KindMismatch {
        request_id: RequestId,
        expected: OperationKind,
        actual: OperationKind,
    },
    #[error("runtime call failed: {0}")]
    Runtime(ResultCode),
}

impl From<ResultCode> for EngineError {
    fn from(code: ResultCode) -> Self {
        match code {
            ResultCode::ValidationFailure => Self::ValidationFailure,
            ResultCode::ComponentNotSupported => Self::ComponentNotSupported,
            ResultCode::ComponentNotEnabled => Self::ComponentNotEnabled,
            ResultCode::ComponentStatusPending => Self::ComponentStatusPending,
            ResultCode::ComponentStatusAlreadySet => Self::ComponentStatusAlreadySet,
            other => Self::Runtime(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes_map_onto_taxonomy() {
        assert_eq!(
            EngineError::from(ResultCode::ComponentStatusPending),
            EngineError::ComponentStatusPending
        );
        assert_eq!(
            EngineError::from(ResultCode::HandleInvalid),
            EngineError::Runtime(ResultCode::HandleInvalid)
        );
    }

    #[test]
    fn unavailable_names_extension() {
        let err = EngineError::Unavailable(Extension::Query);
        assert_eq!(err.to_string(), "XR_FB_spatial_entity_query is not available");
    }
}

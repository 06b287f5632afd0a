//! Boundary to the native tracking runtime.
//!
//! The engine never resolves symbols or marshals event buffers; it talks to the
//! runtime through [`SpatialRuntime`], which a binding layer (or [`crate::sim`])
//! implements. Every asynchronous call returns a [`RequestId`] immediately and
//! completes later through [`SpatialRuntime::poll_event`].

use tether_types::{
    AnchorId, ComponentStatus, ComponentStatusSetInfo, ComponentType, CreateAnchorInfo,
    EngineError, EraseInfo, Extension, QueryInfo, QueryResult, RequestId, ResultCode, SaveInfo,
    SpaceHandle, SpaceLocation, SpatialEvent, Time,
};

/// Native calls the engine depends on.
///
/// Enumeration methods follow the two-call idiom: an empty `out` slice asks for
/// the required count; a non-empty one is filled and the count written is
/// returned. A slice that is too small yields [`ResultCode::SizeInsufficient`].
pub trait SpatialRuntime {
    fn create_spatial_anchor(&mut self, info: &CreateAnchorInfo) -> Result<RequestId, ResultCode>;

    fn space_uuid(&mut self, space: SpaceHandle) -> Result<AnchorId, ResultCode>;

    fn enumerate_supported_components(
        &mut self,
        space: SpaceHandle,
        out: &mut [ComponentType],
    ) -> Result<u32, ResultCode>;

    fn set_component_status(
        &mut self,
        space: SpaceHandle,
        info: &ComponentStatusSetInfo,
    ) -> Result<RequestId, ResultCode>;

    fn component_status(
        &mut self,
        space: SpaceHandle,
        component: ComponentType,
    ) -> Result<ComponentStatus, ResultCode>;

    fn save_space(&mut self, info: &SaveInfo) -> Result<RequestId, ResultCode>;

    fn erase_space(&mut self, info: &EraseInfo) -> Result<RequestId, ResultCode>;

    fn query_spaces(&mut self, info: &QueryInfo) -> Result<RequestId, ResultCode>;

    fn retrieve_query_results(
        &mut self,
        request_id: RequestId,
        out: &mut [QueryResult],
    ) -> Result<u32, ResultCode>;

    /// Synchronous locate of `space` relative to `base` at `time`.
    fn locate_space(
        &mut self,
        space: SpaceHandle,
        base: SpaceHandle,
        time: Time,
    ) -> Result<SpaceLocation, ResultCode>;

    /// Next queued event, if any. Never blocks.
    fn poll_event(&mut self) -> Option<SpatialEvent>;
}

/// Which native extensions bootstrap managed to negotiate.
///
/// Computed once at startup and handed to the engine; the engine never probes
/// for extensions itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpatialSupport {
    pub entity: bool,
    pub storage: bool,
    pub query: bool,
}

impl SpatialSupport {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            entity: true,
            storage: true,
            query: true,
        }
    }

    #[must_use]
    pub const fn none() -> Self {
        Self {
            entity: false,
            storage: false,
            query: false,
        }
    }

    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.entity && self.storage && self.query
    }

    #[must_use]
    pub const fn has(self, extension: Extension) -> bool {
        match extension {
            Extension::SpatialEntity => self.entity,
            Extension::Storage => self.storage,
            Extension::Query => self.query,
        }
    }

    pub fn require(self, extension: Extension) -> Result<(), EngineError> {
        if self.has(extension) {
            Ok(())
        } else {
            Err(EngineError::Unavailable(extension))
        }
    }
}

/// Per-frame inputs: the moving reference space and the frame time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    pub reference_space: SpaceHandle,
    pub time: Time,
}

impl FrameContext {
    #[must_use]
    pub const fn new(reference_space: SpaceHandle, time: Time) -> Self {
        Self {
            reference_space,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_missing_extension() {
        let support = SpatialSupport {
            entity: true,
            storage: false,
            query: true,
        };
        assert!(support.require(Extension::SpatialEntity).is_ok());
        assert_eq!(
            support.require(Extension::Storage),
            Err(EngineError::Unavailable(Extension::Storage))
        );
        assert!(!support.is_complete());
        assert!(SpatialSupport::all().is_complete());
        assert!(!SpatialSupport::none().has(Extension::Query));
    }
}

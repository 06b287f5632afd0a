//! Core domain types for Tether.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything the engine exchanges with a spatial runtime (identities, poses,
//! component types, result codes, completion events, submission infos) lives here
//! so any layer can name it without pulling in the engine.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod component;
mod error;
mod event;
mod geometry;
mod ids;
mod native;
mod result;

pub use component::{Capabilities, ComponentStatus, ComponentType};
pub use error::{EngineError, Extension};
pub use event::{Completion, OperationKind, SpatialEvent};
pub use geometry::{Pose, Quat, Vec3};
pub use ids::{AnchorId, RequestId, SpaceHandle, Time};
pub use native::{
    ComponentStatusSetInfo, CreateAnchorInfo, EraseInfo, INFINITE_DURATION, LocationFlags,
    PersistenceMode, QueryAction, QueryInfo, QueryResult, SaveInfo, SpaceLocation,
    StorageLocation,
};
pub use result::ResultCode;

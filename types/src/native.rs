//! Submission infos and out-structs exchanged with the runtime.
//!
//! These mirror the native call parameters closely enough that a binding layer
//! can translate them field-for-field.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{AnchorId, ComponentType, Pose, SpaceHandle, Time};

/// Native timeout value meaning "never time out".
pub const INFINITE_DURATION: i64 = i64::MAX;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLocation {
    #[default]
    Local,
    Cloud,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    #[default]
    Indefinite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum QueryAction {
    #[default]
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreateAnchorInfo {
    /// Reference space `pose` is expressed in.
    pub space: SpaceHandle,
    pub pose: Pose,
    pub time: Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStatusSetInfo {
    pub component: ComponentType,
    pub enabled: bool,
    /// Nanoseconds; [`INFINITE_DURATION`] for no timeout.
    pub timeout: i64,
}

impl ComponentStatusSetInfo {
    #[must_use]
    pub const fn new(component: ComponentType, enabled: bool) -> Self {
        Self {
            component,
            enabled,
            timeout: INFINITE_DURATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveInfo {
    pub space: SpaceHandle,
    pub location: StorageLocation,
    pub persistence_mode: PersistenceMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseInfo {
    pub space: SpaceHandle,
    pub location: StorageLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryInfo {
    pub action: QueryAction,
    pub max_result_count: u32,
    /// Nanoseconds; zero selects the runtime default.
    pub timeout: i64,
    /// Restrict the query to one storage location. `None` queries all.
    pub location_filter: Option<StorageLocation>,
}

/// One entry of a space query result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub space: SpaceHandle,
    pub uuid: Option<AnchorId>,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct LocationFlags: u64 {
        const ORIENTATION_VALID = 0x1;
        const POSITION_VALID = 0x2;
        const ORIENTATION_TRACKED = 0x4;
        const POSITION_TRACKED = 0x8;
    }
}

/// Output of a locate call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpaceLocation {
    pub flags: LocationFlags,
    pub pose: Pose,
}

impl SpaceLocation {
    #[must_use]
    pub const fn new(pose: Pose, flags: LocationFlags) -> Self {
        Self { flags, pose }
    }

    /// Both orientation and position are usable.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.flags
            .contains(LocationFlags::ORIENTATION_VALID.union(LocationFlags::POSITION_VALID))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_result_has_null_handle() {
        let slot = QueryResult::default();
        assert!(slot.space.is_null());
        assert_eq!(slot.uuid, None);
    }

    #[test]
    fn location_requires_both_valid_bits() {
        let pose = Pose::at(1.0, 0.0, 0.0);
        assert!(
            SpaceLocation::new(
                pose,
                LocationFlags::ORIENTATION_VALID | LocationFlags::POSITION_VALID
            )
            .is_valid()
        );
        assert!(!SpaceLocation::new(pose, LocationFlags::POSITION_VALID).is_valid());
        assert!(!SpaceLocation::new(pose, LocationFlags::ORIENTATION_TRACKED).is_valid());
    }

    #[test]
    fn component_enable_defaults_to_infinite_timeout() {
        let info = ComponentStatusSetInfo::new(ComponentType::Locatable, true);
        assert_eq!(info.timeout, INFINITE_DURATION);
    }
}

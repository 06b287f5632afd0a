//! Anchor components (capabilities) and their status.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Optional feature of a space that must be explicitly enabled.
///
/// Discriminants match the native enumeration values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    #[default]
    Locatable = 0,
    Storable = 1,
    Bounded2d = 3,
    Bounded3d = 4,
    SemanticLabels = 5,
    RoomLayout = 6,
    SpaceContainer = 7,
}

impl ComponentType {
    pub const ALL: [Self; 7] = [
        Self::Locatable,
        Self::Storable,
        Self::Bounded2d,
        Self::Bounded3d,
        Self::SemanticLabels,
        Self::RoomLayout,
        Self::SpaceContainer,
    ];

    #[must_use]
    pub const fn raw(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.raw() == raw)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locatable => "locatable",
            Self::Storable => "storable",
            Self::Bounded2d => "bounded_2d",
            Self::Bounded3d => "bounded_3d",
            Self::SemanticLabels => "semantic_labels",
            Self::RoomLayout => "room_layout",
            Self::SpaceContainer => "space_container",
        }
    }

    /// The flag this component occupies in a [`Capabilities`] set.
    #[must_use]
    pub const fn flag(self) -> Capabilities {
        match self {
            Self::Locatable => Capabilities::LOCATABLE,
            Self::Storable => Capabilities::STORABLE,
            Self::Bounded2d => Capabilities::BOUNDED_2D,
            Self::Bounded3d => Capabilities::BOUNDED_3D,
            Self::SemanticLabels => Capabilities::SEMANTIC_LABELS,
            Self::RoomLayout => Capabilities::ROOM_LAYOUT,
            Self::SpaceContainer => Capabilities::SPACE_CONTAINER,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Set of components whose enablement has completed for an anchor.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const LOCATABLE = 1 << 0;
        const STORABLE = 1 << 1;
        const BOUNDED_2D = 1 << 3;
        const BOUNDED_3D = 1 << 4;
        const SEMANTIC_LABELS = 1 << 5;
        const ROOM_LAYOUT = 1 << 6;
        const SPACE_CONTAINER = 1 << 7;
    }
}

impl Capabilities {
    #[must_use]
    pub fn has(self, component: ComponentType) -> bool {
        self.contains(component.flag())
    }

    pub fn set_component(&mut self, component: ComponentType, enabled: bool) {
        self.set(component.flag(), enabled);
    }
}

/// Native status of one component on one space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentStatus {
    pub enabled: bool,
    /// An enable/disable request for this component is still in flight.
    pub change_pending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_skips_unassigned_value() {
        assert_eq!(ComponentType::from_raw(1), Some(ComponentType::Storable));
        assert_eq!(ComponentType::from_raw(2), None);
        assert_eq!(ComponentType::from_raw(7), Some(ComponentType::SpaceContainer));
    }

    #[test]
    fn capabilities_track_components() {
        let mut caps = Capabilities::empty();
        caps.set_component(ComponentType::Storable, true);
        assert!(caps.has(ComponentType::Storable));
        assert!(!caps.has(ComponentType::Locatable));

        caps.set_component(ComponentType::Storable, false);
        assert!(caps.is_empty());
    }
}

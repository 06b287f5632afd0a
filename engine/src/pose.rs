//! Per-tick pose refresh.

use tether_types::{AnchorId, SpaceHandle};

use crate::registry::{Anchor, AnchorRegistry};
use crate::runtime::{FrameContext, SpatialRuntime};

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocateSummary {
    pub located: usize,
    pub stale: usize,
}

impl LocateSummary {
    #[must_use]
    pub fn total(self) -> usize {
        self.located + self.stale
    }
}

/// Locate every registered anchor against `frame` once.
///
/// A location missing either valid bit, or a failed locate call, keeps the
/// previous pose and clears the located flag.
pub fn refresh_poses<R: SpatialRuntime + ?Sized>(
    runtime: &mut R,
    registry: &mut AnchorRegistry,
    frame: FrameContext,
) -> LocateSummary {
    let targets: Vec<(AnchorId, SpaceHandle, bool)> = registry
        .iter()
        .map(|a| (a.id(), a.space(), a.is_located()))
        .collect();

    let mut summary = LocateSummary::default();
    for (id, space, was_located) in targets {
        match runtime.locate_space(space, frame.reference_space, frame.time) {
            Ok(location) if location.is_valid() => {
                registry.update_pose(id, location.pose, true);
                summary.located += 1;
                continue;
            }
            Ok(location) => {
                tracing::debug!(anchor = %id, flags = ?location.flags, "Location not valid");
            }
            Err(code) => {
                tracing::debug!(anchor = %id, handle = %space, result = %code, "Locate failed");
            }
        }

        if was_located {
            tracing::warn!(anchor = %id, handle = %space, "Anchor lost tracking; keeping last pose");
        }
        let last = registry.get(id).and_then(Anchor::pose).unwrap_or_default();
        registry.update_pose(id, last, false);
        summary.stale += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use tether_types::{LocationFlags, Pose, SpaceLocation, Time};

    use super::*;
    use crate::sim::{DEFAULT_COMPONENTS, SimRuntime};

    const REFERENCE: SpaceHandle = SpaceHandle::new(1);

    fn frame() -> FrameContext {
        FrameContext::new(REFERENCE, Time::from_nanos(1_000))
    }

    fn setup() -> (SimRuntime, AnchorRegistry, AnchorId, SpaceHandle) {
        let mut runtime = SimRuntime::manual();
        let mut registry = AnchorRegistry::new();
        let id = AnchorId::from_u128(1);
        let space = SpaceHandle::new(0x10);
        runtime.add_space(space, id, &DEFAULT_COMPONENTS);
        registry.insert(id, space).unwrap();
        (runtime, registry, id, space)
    }

    #[test]
    fn valid_location_updates_pose() {
        let (mut runtime, mut registry, id, space) = setup();
        let pose = Pose::at(0.5, 1.5, -1.0);
        runtime.set_location(
            space,
            SpaceLocation::new(
                pose,
                LocationFlags::ORIENTATION_VALID | LocationFlags::POSITION_VALID,
            ),
        );

        let summary = refresh_poses(&mut runtime, &mut registry, frame());
        assert_eq!(summary, LocateSummary { located: 1, stale: 0 });
        let anchor = registry.get(id).unwrap();
        assert_eq!(anchor.pose(), Some(pose));
        assert!(anchor.is_located());
    }

    #[test]
    fn partially_valid_location_is_stale() {
        let (mut runtime, mut registry, id, space) = setup();
        let pose_b = Pose::at(2.0, 0.0, 0.0);
        runtime.set_location(space, SpaceLocation::new(pose_b, LocationFlags::all()));
        refresh_poses(&mut runtime, &mut registry, frame());

        runtime.set_location(
            space,
            SpaceLocation::new(Pose::at(7.0, 7.0, 7.0), LocationFlags::POSITION_VALID),
        );
        let summary = refresh_poses(&mut runtime, &mut registry, frame());
        assert_eq!(summary, LocateSummary { located: 0, stale: 1 });
        let anchor = registry.get(id).unwrap();
        assert_eq!(anchor.pose(), Some(pose_b));
        assert!(!anchor.is_located());
    }

    #[test]
    fn locate_error_never_sets_pose() {
        let mut runtime = SimRuntime::manual();
        let mut registry = AnchorRegistry::new();
        let id = AnchorId::from_u128(2);
        // Space unknown to the runtime: every locate fails.
        registry.insert(id, SpaceHandle::new(0x99)).unwrap();

        let summary = refresh_poses(&mut runtime, &mut registry, frame());
        assert_eq!(summary.stale, 1);
        assert_eq!(registry.get(id).unwrap().pose(), None);
    }

    #[test]
    fn empty_registry_is_noop() {
        let mut runtime = SimRuntime::manual();
        let mut registry = AnchorRegistry::new();
        assert_eq!(
            refresh_poses(&mut runtime, &mut registry, frame()).total(),
            0
        );
    }
}

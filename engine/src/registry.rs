//! Anchor registry: the live anchors and the discovered-but-not-yet-locatable
//! staging area.
//!
//! The registry exclusively owns every registered anchor's native handle; nothing
//! outside the engine may destroy or reuse a handle while its anchor is present.
//! Callers only ever see snapshots.

use indexmap::IndexMap;
use tether_types::{AnchorId, Capabilities, ComponentType, EngineError, Pose, SpaceHandle};

/// A registered spatial anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    id: AnchorId,
    space: SpaceHandle,
    pose: Option<Pose>,
    located: bool,
    capabilities: Capabilities,
}

impl Anchor {
    fn new(id: AnchorId, space: SpaceHandle) -> Self {
        Self {
            id,
            space,
            pose: None,
            located: false,
            capabilities: Capabilities::empty(),
        }
    }

    #[must_use]
    pub fn id(&self) -> AnchorId {
        self.id
    }

    #[must_use]
    pub fn space(&self) -> SpaceHandle {
        self.space
    }

    /// Last known pose; `None` until the first successful locate.
    #[must_use]
    pub fn pose(&self) -> Option<Pose> {
        self.pose
    }

    /// Whether the most recent locate succeeded. `false` with a pose present
    /// means the pose is stale.
    #[must_use]
    pub fn is_located(&self) -> bool {
        self.located
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// Lookup key for operations that may only know one side of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorRef {
    Id(AnchorId),
    Space(SpaceHandle),
}

impl From<AnchorId> for AnchorRef {
    fn from(id: AnchorId) -> Self {
        Self::Id(id)
    }
}

impl From<SpaceHandle> for AnchorRef {
    fn from(space: SpaceHandle) -> Self {
        Self::Space(space)
    }
}

/// A space returned by a storage query, waiting for LOCATABLE to complete.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StagedAnchor {
    id: AnchorId,
    capabilities: Capabilities,
}

/// Result of promoting a staged anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    /// Newly visible in the registry.
    Registered,
    /// Was already registered; only the LOCATABLE flag was recorded.
    AlreadyRegistered,
    /// Neither staged nor registered, e.g. erased before the completion
    /// arrived. Nothing was inserted.
    NotTracked,
}

#[derive(Debug, Default)]
pub struct AnchorRegistry {
    anchors: IndexMap<AnchorId, Anchor>,
    staged: IndexMap<SpaceHandle, StagedAnchor>,
}

impl AnchorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: AnchorId, space: SpaceHandle) -> Result<(), EngineError> {
        if self.anchors.contains_key(&id) {
            return Err(EngineError::DuplicateIdentity(id));
        }
        self.anchors.insert(id, Anchor::new(id, space));
        Ok(())
    }

    /// Idempotent: removing an absent identity is a no-op.
    pub fn remove(&mut self, id: AnchorId) -> Option<Anchor> {
        self.anchors.shift_remove(&id)
    }

    /// Record a locate outcome. A failed locate keeps the previous pose and only
    /// clears the located flag. Absent identities are ignored.
    pub fn update_pose(&mut self, id: AnchorId, pose: Pose, success: bool) {
        let Some(anchor) = self.anchors.get_mut(&id) else {
            return;
        };
        if success {
            anchor.pose = Some(pose);
        }
        anchor.located = success;
    }

    /// Set or clear a capability flag on a registered or staged anchor.
    /// Returns `false` when no anchor matches.
    pub fn set_capability(
        &mut self,
        target: impl Into<AnchorRef>,
        component: ComponentType,
        enabled: bool,
    ) -> bool {
        match target.into() {
            AnchorRef::Id(id) => {
                if let Some(anchor) = self.anchors.get_mut(&id) {
                    anchor.capabilities.set_component(component, enabled);
                    return true;
                }
                if let Some(staged) = self.staged.values_mut().find(|s| s.id == id) {
                    staged.capabilities.set_component(component, enabled);
                    return true;
                }
                false
            }
            AnchorRef::Space(space) => {
                if let Some(anchor) = self.anchors.values_mut().find(|a| a.space == space) {
                    anchor.capabilities.set_component(component, enabled);
                    return true;
                }
                if let Some(staged) = self.staged.get_mut(&space) {
                    staged.capabilities.set_component(component, enabled);
                    return true;
                }
                false
            }
        }
    }

    /// Snapshot in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Anchor> {
        self.anchors.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }

    #[must_use]
    pub fn get(&self, id: AnchorId) -> Option<&Anchor> {
        self.anchors.get(&id)
    }

    #[must_use]
    pub fn find_by_space(&self, space: SpaceHandle) -> Option<&Anchor> {
        self.anchors.values().find(|a| a.space == space)
    }

    #[must_use]
    pub fn contains(&self, id: AnchorId) -> bool {
        self.anchors.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Stage a discovered space. Returns `false` if the identity is already
    /// registered or the space is already staged.
    pub fn stage(&mut self, space: SpaceHandle, id: AnchorId) -> bool {
        if self.anchors.contains_key(&id) || self.staged.contains_key(&space) {
            return false;
        }
        self.staged.insert(
            space,
            StagedAnchor {
                id,
                capabilities: Capabilities::empty(),
            },
        );
        true
    }

    /// Drop a staged space (LOCATABLE failed or is unsupported).
    pub fn unstage(&mut self, space: SpaceHandle) -> bool {
        self.staged.shift_remove(&space).is_some()
    }

    #[must_use]
    pub fn is_staged(&self, space: SpaceHandle) -> bool {
        self.staged.contains_key(&space)
    }

    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// LOCATABLE completed for `space`: make the anchor visible.
    ///
    /// Capabilities recorded while staged carry over. A space that is neither
    /// staged nor registered is left alone: its handle is already gone.
    pub fn promote(&mut self, space: SpaceHandle, id: AnchorId) -> Promotion {
        let staged = self.staged.shift_remove(&space);

        if let Some(anchor) = self.anchors.get_mut(&id) {
            anchor.capabilities.insert(Capabilities::LOCATABLE);
            return Promotion::AlreadyRegistered;
        }

        let Some(staged) = staged else {
            return Promotion::NotTracked;
        };
        if staged.id != id {
            tracing::warn!(
                handle = %space,
                staged = %staged.id,
                reported = %id,
                "Staged anchor identity differs from completion; using reported identity"
            );
        }
        let mut anchor = Anchor::new(id, space);
        anchor.capabilities = staged.capabilities;
        anchor.capabilities.insert(Capabilities::LOCATABLE);
        self.anchors.insert(id, anchor);
        Promotion::Registered
    }
}

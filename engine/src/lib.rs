//! Core engine for Tether - asynchronous spatial anchor lifecycle.
//!
//! [`AnchorEngine`] submits anchor operations to a [`SpatialRuntime`] without
//! waiting on them, correlates the completion events that arrive later by
//! request id, and keeps the registry of live anchors whose poses are
//! refreshed once per [`AnchorEngine::tick`].
//!
//! Nothing here spawns threads or awaits. The host drives everything from its
//! frame loop.

mod config;
mod dispatch;
mod persistence;
mod pose;
mod probe;
mod registry;
mod requests;
mod runtime;
pub mod sim;


pub use config::{
    ConfigError, DEFAULT_QUERY_MAX_RESULTS, EngineConfig, EngineSection, LogConfig, QueryConfig,
    StorageConfig, TetherConfig, config_path,
};
pub use dispatch::DispatchStats;
pub use persistence::PersistenceCoordinator;
pub use pose::{LocateSummary, refresh_poses};
pub use probe::{CapabilityProbe, ENUMERATION_ATTEMPTS, enumerate_two_call};
pub use registry::{Anchor, AnchorRef, AnchorRegistry, Promotion};
pub use requests::{Continuation, PendingRequest, RequestTable, StaleRequest};
pub use runtime::{FrameContext, SpatialRuntime, SpatialSupport};

pub use tether_types::{
    AnchorId, Capabilities, ComponentStatus, ComponentType, Completion, EngineError, Extension,
    OperationKind, Pose, RequestId, ResultCode, SpaceHandle, SpatialEvent, Time,
};

use tether_types::CreateAnchorInfo;

use persistence::track;

/// What one call to [`AnchorEngine::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Events dispatched, in delivery order.
    pub events: usize,
    pub poses: LocateSummary,
    /// Requests that crossed the stale threshold this tick.
    pub stale_requests: usize,
}

/// Requests still in flight when the engine was torn down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub abandoned: Vec<(RequestId, OperationKind)>,
}

/// The anchor lifecycle engine.
///
/// Owns the request table and the anchor registry outright. Callers observe
/// anchors through snapshots and continuations only.
pub struct AnchorEngine<R: SpatialRuntime> {
    runtime: R,
    support: SpatialSupport,
    enabled: bool,
    config: EngineConfig,
    requests: RequestTable,
    registry: AnchorRegistry,
    persistence: PersistenceCoordinator,
    stats: DispatchStats,
    tick: u64,
    load_pending: bool,
}

impl<R: SpatialRuntime> AnchorEngine<R> {
    pub fn new(runtime: R, support: SpatialSupport, config: EngineConfig) -> Self {
        if support.is_complete() {
            tracing::info!("Spatial anchor support available");
        } else {
            tracing::warn!(
                entity = support.entity,
                storage = support.storage,
                query = support.query,
                "Spatial anchor support incomplete"
            );
        }

        Self {
            runtime,
            support,
            enabled: true,
            persistence: PersistenceCoordinator::new(&config),
            load_pending: config.load_on_start,
            config,
            requests: RequestTable::new(),
            registry: AnchorRegistry::new(),
            stats: DispatchStats::default(),
            tick: 0,
        }
    }

    /// All three extensions were negotiated.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.support.is_complete()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.is_available()
    }

    /// Host-side toggle. Disabling rejects new submissions; in-flight requests
    /// still complete.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            tracing::info!(enabled, "Spatial anchors toggled");
        }
        self.enabled = enabled;
    }

    #[must_use]
    pub fn support(&self) -> SpatialSupport {
        self.support
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn check(&self, extension: Extension) -> Result<(), EngineError> {
        if !self.enabled {
            return Err(EngineError::Disabled);
        }
        self.support.require(extension)
    }

    fn space_of(&self, id: AnchorId) -> Result<SpaceHandle, EngineError> {
        self.registry
            .get(id)
            .map(Anchor::space)
            .ok_or(EngineError::UnknownAnchor(id))
    }

    // ========================================================================
    // Submissions
    // ========================================================================

    /// Create an anchor at `pose` in `frame.reference_space`.
    pub fn create_anchor(
        &mut self,
        pose: Pose,
        frame: FrameContext,
        continuation: Continuation,
    ) -> Result<RequestId, EngineError> {
        self.check(Extension::SpatialEntity)?;
        let info = CreateAnchorInfo {
            space: frame.reference_space,
            pose,
            time: frame.time,
        };
        let submitted = self.runtime.create_spatial_anchor(&info);
        let pending = PendingRequest::new(OperationKind::Create, continuation, self.tick);
        track(&mut self.requests, submitted, pending)
    }

    pub fn save_anchor(
        &mut self,
        id: AnchorId,
        continuation: Continuation,
    ) -> Result<RequestId, EngineError> {
        self.check(Extension::Storage)?;
        let space = self.space_of(id)?;
        self.persistence.save(
            &mut self.runtime,
            &mut self.requests,
            space,
            continuation,
            self.tick,
        )
    }

    /// Erase from storage. The anchor leaves the registry when the erase
    /// completes, whatever its result.
    pub fn erase_anchor(
        &mut self,
        id: AnchorId,
        continuation: Continuation,
    ) -> Result<RequestId, EngineError> {
        self.check(Extension::Storage)?;
        let space = self.space_of(id)?;
        self.persistence.erase(
            &mut self.runtime,
            &mut self.requests,
            space,
            continuation,
            self.tick,
        )
    }

    pub fn set_component(
        &mut self,
        id: AnchorId,
        component: ComponentType,
        enabled: bool,
        continuation: Continuation,
    ) -> Result<RequestId, EngineError> {
        self.check(Extension::SpatialEntity)?;
        let space = self.space_of(id)?;
        self.submit_component(space, component, enabled, continuation)
    }

    /// Query storage for every saved anchor. The success continuation fires
    /// when the query round finishes, with the number of anchors discovered.
    pub fn load_all(&mut self, continuation: Continuation) -> Result<RequestId, EngineError> {
        self.check(Extension::Query)?;
        self.persistence
            .load_all(&mut self.runtime, &mut self.requests, continuation, self.tick)
    }

    /// Erase every registered anchor. Submission failures are logged and
    /// skipped; the returned ids are the erases actually in flight.
    pub fn erase_all(&mut self) -> Result<Vec<RequestId>, EngineError> {
        self.check(Extension::Storage)?;
        let targets: Vec<(AnchorId, SpaceHandle)> =
            self.registry.iter().map(|a| (a.id(), a.space())).collect();

        let mut submitted = Vec::with_capacity(targets.len());
        for (id, space) in targets {
            match self.persistence.erase(
                &mut self.runtime,
                &mut self.requests,
                space,
                Continuation::none(),
                self.tick,
            ) {
                Ok(request_id) => submitted.push(request_id),
                Err(e) => tracing::warn!(anchor = %id, error = %e, "Skipping erase"),
            }
        }
        tracing::info!(count = submitted.len(), "Erasing all anchors");
        Ok(submitted)
    }

    /// Native status of `component` on a registered anchor.
    pub fn component_status(
        &mut self,
        id: AnchorId,
        component: ComponentType,
    ) -> Result<ComponentStatus, EngineError> {
        self.check(Extension::SpatialEntity)?;
        let space = self.space_of(id)?;
        self.runtime
            .component_status(space, component)
            .map_err(EngineError::from)
    }

    pub fn supported_components(
        &mut self,
        id: AnchorId,
    ) -> Result<Vec<ComponentType>, EngineError> {
        self.check(Extension::SpatialEntity)?;
        let space = self.space_of(id)?;
        CapabilityProbe::supported_components(&mut self.runtime, space)
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Snapshot of registered anchors in registration order.
    #[must_use]
    pub fn anchors(&self) -> Vec<Anchor> {
        self.registry.list()
    }

    #[must_use]
    pub fn anchor(&self, id: AnchorId) -> Option<&Anchor> {
        self.registry.get(id)
    }

    #[must_use]
    pub fn anchor_count(&self) -> usize {
        self.registry.len()
    }

    /// Discovered anchors waiting for LOCATABLE.
    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.registry.staged_len()
    }

    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    #[must_use]
    pub fn is_pending(&self, request_id: RequestId) -> bool {
        self.requests.contains(request_id)
    }

    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Drain every event the runtime currently has, in delivery order.
    pub fn poll_events(&mut self) -> usize {
        let mut count = 0;
        while let Some(event) = self.runtime.poll_event() {
            self.handle_event(event);
            count += 1;
        }
        count
    }

    /// One cooperative step: dispatch pending events, then refresh poses.
    pub fn tick(&mut self, frame: FrameContext) -> TickReport {
        self.tick += 1;

        if std::mem::take(&mut self.load_pending)
            && let Err(e) = self.load_all(Continuation::none())
        {
            tracing::warn!(error = %e, "Startup load skipped");
        }

        let events = self.poll_events();
        let poses = refresh_poses(&mut self.runtime, &mut self.registry, frame);

        let stale = self
            .requests
            .take_newly_stale(self.tick, self.config.stale_request_ticks);
        for request in &stale {
            tracing::warn!(
                request_id = %request.request_id,
                operation = %request.kind,
                age_ticks = request.age_ticks,
                "Request still pending"
            );
        }

        TickReport {
            tick: self.tick,
            events,
            poses,
            stale_requests: stale.len(),
        }
    }

    /// Stop driving the engine. Requests still in flight are dropped without
    /// running their continuations.
    pub fn shutdown(self) -> ShutdownReport {
        self.into_runtime().1
    }

    /// [`shutdown`](Self::shutdown), handing the runtime back to the host.
    pub fn into_runtime(mut self) -> (R, ShutdownReport) {
        let abandoned = self.requests.abandon_all();
        if abandoned.is_empty() {
            tracing::info!(anchors = self.registry.len(), "Anchor engine shut down");
        } else {
            tracing::warn!(
                abandoned = abandoned.len(),
                anchors = self.registry.len(),
                "Anchor engine shut down with requests in flight"
            );
        }
        (self.runtime, ShutdownReport { abandoned })
    }
}

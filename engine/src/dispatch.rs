//! Completion event dispatch.
//!
//! One event at a time, never re-entrantly. Every completion is first matched
//! against the request table; an unmatched or mismatched event is an anomaly
//! that is logged and counted, and the loop carries on with the next event.

use tether_types::{
    AnchorId, ComponentStatusSetInfo, ComponentType, Completion, EngineError, Extension,
    OperationKind, QueryResult, RequestId, ResultCode, SpaceHandle, SpatialEvent,
    StorageLocation,
};

use crate::persistence::track;
use crate::probe::{CapabilityProbe, enumerate_two_call};
use crate::registry::Promotion;
use crate::requests::{Continuation, PendingRequest};
use crate::runtime::SpatialRuntime;
use crate::AnchorEngine;

/// Running counters over everything the dispatcher has handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub events: u64,
    pub anomalies: u64,
    pub anchors_created: u64,
    pub saves_succeeded: u64,
    pub saves_failed: u64,
    pub erases: u64,
    pub query_rounds: u64,
    pub discovered: u64,
}

impl<R: SpatialRuntime> AnchorEngine<R> {
    /// Dispatch one event. Anomalies are absorbed here and never propagate.
    pub fn handle_event(&mut self, event: SpatialEvent) {
        self.stats.events += 1;
        tracing::debug!(
            event = event.name(),
            request_id = %event.request_id(),
            "Dispatching event"
        );

        match event {
            SpatialEvent::CreateComplete {
                request_id,
                result,
                space,
                uuid,
            } => self.on_create_complete(request_id, result, space, uuid),
            SpatialEvent::ComponentStatusComplete {
                request_id,
                result,
                space,
                uuid,
                component,
                enabled,
            } => self.on_component_status_complete(
                request_id, result, space, uuid, component, enabled,
            ),
            SpatialEvent::SaveComplete {
                request_id,
                result,
                uuid,
                location,
                ..
            } => self.on_save_complete(request_id, result, uuid, location),
            SpatialEvent::EraseComplete {
                request_id,
                result,
                space,
                uuid,
                ..
            } => self.on_erase_complete(request_id, result, space, uuid),
            SpatialEvent::QueryResultsAvailable { request_id } => {
                self.on_query_results_available(request_id);
            }
            SpatialEvent::QueryComplete { request_id, result } => {
                self.on_query_complete(request_id, result);
            }
        }
    }

    /// Consume the pending entry for a completion of kind `actual`.
    fn take_pending(
        &mut self,
        request_id: RequestId,
        actual: OperationKind,
    ) -> Option<PendingRequest> {
        let Some(pending) = self.requests.consume(request_id) else {
            self.record_anomaly(&EngineError::UnknownRequestId(request_id));
            return None;
        };
        if pending.kind() != actual {
            let err = EngineError::KindMismatch {
                request_id,
                expected: pending.kind(),
                actual,
            };
            self.record_anomaly(&err);
            pending.into_continuation().fail(err);
            return None;
        }
        Some(pending)
    }

    fn record_anomaly(&mut self, error: &EngineError) {
        self.stats.anomalies += 1;
        tracing::warn!(error = %error, "Dropping event");
    }

    fn on_create_complete(
        &mut self,
        request_id: RequestId,
        result: ResultCode,
        space: SpaceHandle,
        uuid: AnchorId,
    ) {
        let Some(pending) = self.take_pending(request_id, OperationKind::Create) else {
            return;
        };
        let continuation = pending.into_continuation();

        if !result.is_success() {
            tracing::warn!(request_id = %request_id, result = %result, "Anchor creation failed");
            continuation.fail(result.into());
            return;
        }
        if let Err(e) = self.registry.insert(uuid, space) {
            self.record_anomaly(&e);
            continuation.fail(e);
            return;
        }

        self.stats.anchors_created += 1;
        tracing::info!(anchor = %uuid, handle = %space, "Anchor created");
        continuation.succeed(Completion::Created { id: uuid, space });

        if self.config.persist_on_create {
            self.chain_storable(space, uuid);
        }
    }

    /// Enable STORABLE on a fresh anchor so its completion saves it.
    fn chain_storable(&mut self, space: SpaceHandle, id: AnchorId) {
        if !self.support.has(Extension::Storage) {
            tracing::debug!(anchor = %id, "Storage unavailable; not persisting new anchor");
            return;
        }
        if !CapabilityProbe::supports(&mut self.runtime, space, ComponentType::Storable) {
            tracing::debug!(anchor = %id, "Anchor is not storable");
            return;
        }
        // Already enabled: no completion will follow, so save now.
        if let Err(EngineError::ComponentStatusAlreadySet) =
            self.submit_component(space, ComponentType::Storable, true, Continuation::none())
        {
            self.registry.set_capability(id, ComponentType::Storable, true);
            self.chain_save(space, id);
        }
    }

    fn chain_save(&mut self, space: SpaceHandle, id: AnchorId) {
        if !self.support.has(Extension::Storage) {
            tracing::debug!(anchor = %id, "Storage unavailable; skipping save");
            return;
        }
        match self.persistence.save(
            &mut self.runtime,
            &mut self.requests,
            space,
            Continuation::none(),
            self.tick,
        ) {
            Ok(request_id) => {
                tracing::debug!(anchor = %id, request_id = %request_id, "Save submitted");
            }
            Err(_) => self.stats.saves_failed += 1,
        }
    }

    pub(crate) fn submit_component(
        &mut self,
        space: SpaceHandle,
        component: ComponentType,
        enabled: bool,
        continuation: Continuation,
    ) -> Result<RequestId, EngineError> {
        let info = ComponentStatusSetInfo::new(component, enabled);
        let submitted = self.runtime.set_component_status(space, &info);
        let pending = PendingRequest::new(OperationKind::SetComponent, continuation, self.tick)
            .with_subject(space);
        track(&mut self.requests, submitted, pending)
    }

    fn on_component_status_complete(
        &mut self,
        request_id: RequestId,
        result: ResultCode,
        space: SpaceHandle,
        uuid: AnchorId,
        component: ComponentType,
        enabled: bool,
    ) {
        let Some(pending) = self.take_pending(request_id, OperationKind::SetComponent) else {
            return;
        };
        let continuation = pending.into_continuation();
        let completes_discovery = component == ComponentType::Locatable && enabled;

        if !result.is_success_equivalent() {
            tracing::warn!(
                anchor = %uuid,
                component = %component,
                enabled,
                result = %result,
                "Component status change failed"
            );
            if completes_discovery && self.registry.unstage(space) {
                tracing::debug!(handle = %space, "Dropped discovered anchor");
            }
            continuation.fail(result.into());
            return;
        }

        let tracked = if completes_discovery {
            match self.registry.promote(space, uuid) {
                Promotion::Registered => {
                    tracing::info!(anchor = %uuid, handle = %space, "Anchor loaded");
                    true
                }
                Promotion::AlreadyRegistered => {
                    tracing::debug!(anchor = %uuid, "Anchor already registered");
                    true
                }
                Promotion::NotTracked => {
                    tracing::debug!(
                        anchor = %uuid,
                        handle = %space,
                        "Locatable completed for untracked anchor"
                    );
                    false
                }
            }
        } else if self.registry.set_capability(space, component, enabled) {
            true
        } else {
            tracing::debug!(handle = %space, component = %component, "No anchor for component change");
            false
        };

        continuation.succeed(Completion::ComponentSet {
            id: uuid,
            component,
            enabled,
        });

        if tracked && component == ComponentType::Storable && enabled {
            self.chain_save(space, uuid);
        }
    }

    fn on_save_complete(
        &mut self,
        request_id: RequestId,
        result: ResultCode,
        uuid: AnchorId,
        location: StorageLocation,
    ) {
        let Some(pending) = self.take_pending(request_id, OperationKind::Save) else {
            return;
        };
        let continuation = pending.into_continuation();
        if result.is_success() {
            self.stats.saves_succeeded += 1;
            tracing::info!(anchor = %uuid, location = ?location, "Anchor saved");
            continuation.succeed(Completion::Saved { id: uuid });
        } else {
            self.stats.saves_failed += 1;
            tracing::warn!(anchor = %uuid, result = %result, "Anchor save failed");
            continuation.fail(result.into());
        }
    }

    fn on_erase_complete(
        &mut self,
        request_id: RequestId,
        result: ResultCode,
        space: SpaceHandle,
        uuid: AnchorId,
    ) {
        let Some(pending) = self.take_pending(request_id, OperationKind::Erase) else {
            return;
        };
        let continuation = pending.into_continuation();

        // The handle is gone whatever the result says.
        self.stats.erases += 1;
        self.registry.unstage(space);
        match self.registry.remove(uuid) {
            Some(_) => tracing::info!(anchor = %uuid, "Anchor erased"),
            None => tracing::debug!(anchor = %uuid, "Erase completed for unregistered anchor"),
        }

        if result.is_success() {
            continuation.succeed(Completion::Erased { id: uuid });
        } else {
            tracing::warn!(anchor = %uuid, result = %result, "Erase reported failure");
            continuation.fail(result.into());
        }
    }

    fn on_query_results_available(&mut self, request_id: RequestId) {
        match self.requests.get(request_id).map(PendingRequest::kind) {
            None => {
                self.record_anomaly(&EngineError::UnknownRequestId(request_id));
                return;
            }
            Some(OperationKind::Query) => {}
            Some(expected) => {
                self.record_anomaly(&EngineError::KindMismatch {
                    request_id,
                    expected,
                    actual: OperationKind::Query,
                });
                return;
            }
        }

        let results: Vec<QueryResult> =
            match enumerate_two_call(|out| self.runtime.retrieve_query_results(request_id, out)) {
                Ok(results) => results,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Failed to retrieve query results");
                    return;
                }
            };
        tracing::debug!(request_id = %request_id, count = results.len(), "Query results retrieved");

        let staged = results
            .into_iter()
            .filter(|result| self.stage_discovered(*result))
            .count();

        if let Some(pending) = self.requests.get_mut(request_id) {
            pending.record_discovered(staged);
        }
        self.stats.discovered += staged as u64;
    }

    /// Stage one query result and request its enables. Returns whether it
    /// was staged.
    fn stage_discovered(&mut self, result: QueryResult) -> bool {
        let space = result.space;
        let id = match result.uuid {
            Some(id) => id,
            None => match self.runtime.space_uuid(space) {
                Ok(id) => id,
                Err(code) => {
                    tracing::warn!(handle = %space, result = %code, "Query result without identity");
                    return false;
                }
            },
        };

        if !self.registry.stage(space, id) {
            tracing::debug!(anchor = %id, handle = %space, "Query result already tracked");
            return false;
        }

        let components = match CapabilityProbe::supported_components(&mut self.runtime, space) {
            Ok(components) => components,
            Err(e) => {
                tracing::error!(handle = %space, error = %e, "Failed to enumerate supported components");
                self.registry.unstage(space);
                return false;
            }
        };
        if !components.contains(&ComponentType::Locatable) {
            tracing::warn!(anchor = %id, "Loaded anchor is not locatable; ignoring");
            self.registry.unstage(space);
            return false;
        }

        match self.submit_component(space, ComponentType::Locatable, true, Continuation::none()) {
            Ok(_) => {}
            Err(EngineError::ComponentStatusAlreadySet) => {
                if self.registry.promote(space, id) == Promotion::Registered {
                    tracing::info!(anchor = %id, handle = %space, "Anchor loaded");
                }
            }
            Err(_) => {
                self.registry.unstage(space);
                return false;
            }
        }

        if components.contains(&ComponentType::Storable)
            && let Err(EngineError::ComponentStatusAlreadySet) =
                self.submit_component(space, ComponentType::Storable, true, Continuation::none())
        {
            self.registry.set_capability(space, ComponentType::Storable, true);
        }
        true
    }

    fn on_query_complete(&mut self, request_id: RequestId, result: ResultCode) {
        let Some(pending) = self.take_pending(request_id, OperationKind::Query) else {
            return;
        };
        self.stats.query_rounds += 1;
        let discovered = pending.discovered();
        let continuation = pending.into_continuation();

        if result.is_success() {
            tracing::info!(request_id = %request_id, discovered, "Query finished");
            continuation.succeed(Completion::QueryFinished { discovered });
        } else {
            tracing::warn!(request_id = %request_id, result = %result, "Query failed");
            continuation.fail(result.into());
        }
    }
}

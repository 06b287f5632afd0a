//! Ledger of in-flight asynchronous requests.
//!
//! Every submission the engine hands to the runtime is registered here under the
//! request id the runtime returned, and removed exactly once when its completion
//! event is dispatched. There is no timeout: a request whose completion never
//! arrives stays pending until the engine is torn down.

use std::collections::HashMap;
use std::fmt;

use tether_types::{Completion, EngineError, OperationKind, RequestId, SpaceHandle};

type SuccessFn = Box<dyn FnOnce(Completion)>;
type FailureFn = Box<dyn FnOnce(EngineError)>;

/// Caller-supplied callbacks for one submission. Either side may be absent.
#[derive(Default)]
pub struct Continuation {
    on_success: Option<SuccessFn>,
    on_failure: Option<FailureFn>,
}

impl Continuation {
    /// No callbacks. Used for engine-internal chained requests.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(Completion) + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl FnOnce(EngineError) + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on_success.is_none() && self.on_failure.is_none()
    }

    pub(crate) fn succeed(self, completion: Completion) {
        if let Some(f) = self.on_success {
            f(completion);
        }
    }

    pub(crate) fn fail(self, error: EngineError) {
        if let Some(f) = self.on_failure {
            f(error);
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// One operation we are waiting on.
#[derive(Debug)]
pub struct PendingRequest {
    kind: OperationKind,
    continuation: Continuation,
    /// Space the operation targets, when there is one (logging only).
    subject: Option<SpaceHandle>,
    submitted_tick: u64,
    stale_reported: bool,
    /// Query rounds only: anchors staged from this query's results.
    discovered: usize,
}

impl PendingRequest {
    #[must_use]
    pub fn new(kind: OperationKind, continuation: Continuation, submitted_tick: u64) -> Self {
        Self {
            kind,
            continuation,
            subject: None,
            submitted_tick,
            stale_reported: false,
            discovered: 0,
        }
    }

    #[must_use]
    pub fn with_subject(mut self, space: SpaceHandle) -> Self {
        self.subject = Some(space);
        self
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    #[must_use]
    pub fn subject(&self) -> Option<SpaceHandle> {
        self.subject
    }

    #[must_use]
    pub fn submitted_tick(&self) -> u64 {
        self.submitted_tick
    }

    #[must_use]
    pub fn discovered(&self) -> usize {
        self.discovered
    }

    pub(crate) fn record_discovered(&mut self, count: usize) {
        self.discovered = self.discovered.saturating_add(count);
    }

    pub(crate) fn into_continuation(self) -> Continuation {
        self.continuation
    }
}

/// A request that has been pending for longer than the configured threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleRequest {
    pub request_id: RequestId,
    pub kind: OperationKind,
    pub age_ticks: u64,
}

#[derive(Debug, Default)]
pub struct RequestTable {
    pending: HashMap<RequestId, PendingRequest>,
}

impl RequestTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly submitted request.
    ///
    /// The runtime never reuses an id while it is in flight, so a collision is a
    /// protocol violation. The existing entry is kept and the new one rejected.
    pub fn register(
        &mut self,
        request_id: RequestId,
        request: PendingRequest,
    ) -> Result<(), EngineError> {
        if self.pending.contains_key(&request_id) {
            return Err(EngineError::DuplicateRequest(request_id));
        }
        self.pending.insert(request_id, request);
        Ok(())
    }

    /// Remove and return the pending entry for `request_id`.
    pub fn consume(&mut self, request_id: RequestId) -> Option<PendingRequest> {
        self.pending.remove(&request_id)
    }

    #[must_use]
    pub fn contains(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }

    #[must_use]
    pub fn get(&self, request_id: RequestId) -> Option<&PendingRequest> {
        self.pending.get(&request_id)
    }

    pub fn get_mut(&mut self, request_id: RequestId) -> Option<&mut PendingRequest> {
        self.pending.get_mut(&request_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Requests pending for at least `threshold` ticks that have not been
    /// reported yet. Each request is reported once; none are removed.
    pub fn take_newly_stale(&mut self, now: u64, threshold: u64) -> Vec<StaleRequest> {
        if threshold == 0 {
            return Vec::new();
        }
        let mut stale: Vec<StaleRequest> = self
            .pending
            .iter_mut()
            .filter_map(|(id, request)| {
                let age = now.saturating_sub(request.submitted_tick);
                if request.stale_reported || age < threshold {
                    return None;
                }
                request.stale_reported = true;
                Some(StaleRequest {
                    request_id: *id,
                    kind: request.kind,
                    age_ticks: age,
                })
            })
            .collect();
        stale.sort_by_key(|s| s.request_id);
        stale
    }

    /// Drop every entry without invoking any continuation.
    pub fn abandon_all(&mut self) -> Vec<(RequestId, OperationKind)> {
        let mut abandoned: Vec<(RequestId, OperationKind)> = self
            .pending
            .drain()
            .map(|(id, request)| (id, request.kind))
            .collect();
        abandoned.sort_by_key(|(id, _)| *id);
        abandoned
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use tether_types::AnchorId;

    use super::*;

    fn pending(kind: OperationKind) -> PendingRequest {
        PendingRequest::new(kind, Continuation::none(), 0)
    }

    #[test]
    fn register_rejects_duplicate_id() {
        let mut table = RequestTable::new();
        let id = RequestId::new(7);
        table.register(id, pending(OperationKind::Create)).unwrap();

        let err = table.register(id, pending(OperationKind::Save)).unwrap_err();
        assert_eq!(err, EngineError::DuplicateRequest(id));
        // Original entry survives.
        assert_eq!(table.get(id).map(PendingRequest::kind), Some(OperationKind::Create));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn consume_removes_exactly_once() {
        let mut table = RequestTable::new();
        let id = RequestId::new(3);
        table.register(id, pending(OperationKind::Erase)).unwrap();

        assert!(table.consume(id).is_some());
        assert!(table.consume(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn consume_unknown_returns_none() {
        let mut table = RequestTable::new();
        assert!(table.consume(RequestId::new(99)).is_none());
    }

    #[test]
    fn continuation_runs_only_requested_path() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let ok_log = Rc::clone(&log);
        let err_log = Rc::clone(&log);
        let cont = Continuation::none()
            .on_success(move |c| ok_log.borrow_mut().push(format!("ok {c:?}")))
            .on_failure(move |e| err_log.borrow_mut().push(format!("err {e}")));

        cont.succeed(Completion::Saved {
            id: AnchorId::from_u128(1),
        });
        assert_eq!(log.borrow().len(), 1);
        assert!(log.borrow()[0].starts_with("ok"));
    }

    #[test]
    fn empty_continuation_is_noop() {
        let cont = Continuation::none();
        assert!(cont.is_empty());
        cont.fail(EngineError::LocateFailure);
    }

    #[test]
    fn stale_requests_reported_once_and_kept() {
        let mut table = RequestTable::new();
        table
            .register(
                RequestId::new(1),
                PendingRequest::new(OperationKind::Save, Continuation::none(), 2),
            )
            .unwrap();
        table
            .register(
                RequestId::new(2),
                PendingRequest::new(OperationKind::Query, Continuation::none(), 8),
            )
            .unwrap();

        let stale = table.take_newly_stale(10, 5);
        assert_eq!(
            stale,
            vec![StaleRequest {
                request_id: RequestId::new(1),
                kind: OperationKind::Save,
                age_ticks: 8,
            }]
        );
        assert!(table.take_newly_stale(11, 5).is_empty());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn zero_threshold_disables_stale_reporting() {
        let mut table = RequestTable::new();
        table
            .register(RequestId::new(1), pending(OperationKind::Create))
            .unwrap();
        assert!(table.take_newly_stale(1_000, 0).is_empty());
    }

    #[test]
    fn abandon_all_drops_without_callbacks() {
        let called = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&called);
        let mut table = RequestTable::new();
        table
            .register(
                RequestId::new(4),
                PendingRequest::new(
                    OperationKind::Create,
                    Continuation::none().on_failure(move |_| *flag.borrow_mut() = true),
                    0,
                ),
            )
            .unwrap();

        let abandoned = table.abandon_all();
        assert_eq!(abandoned, vec![(RequestId::new(4), OperationKind::Create)]);
        assert!(table.is_empty());
        assert!(!*called.borrow());
    }
}

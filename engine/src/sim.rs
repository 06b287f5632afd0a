//! In-memory [`SpatialRuntime`] for tests and the headless driver.
//!
//! Two modes:
//! - **manual**: submissions are only recorded. Tests push completion events
//!   and set locate results themselves.
//! - **auto**: the runtime completes its own submissions after a fixed latency
//!   measured in [`SimRuntime::advance_tick`] calls, keeping a small anchor
//!   store so saved anchors come back from a load query.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use tether_types::{
    AnchorId, Capabilities, ComponentStatus, ComponentStatusSetInfo, ComponentType,
    CreateAnchorInfo, EraseInfo, LocationFlags, OperationKind, Pose, QueryInfo, QueryResult,
    RequestId, ResultCode, SaveInfo, SpaceHandle, SpaceLocation, SpatialEvent, Time,
};

use crate::runtime::SpatialRuntime;

const FIRST_SPACE_HANDLE: u64 = 0x1000;

/// Components a space supports unless told otherwise.
pub const DEFAULT_COMPONENTS: [ComponentType; 2] =
    [ComponentType::Locatable, ComponentType::Storable];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimMode {
    Manual,
    Auto { latency_ticks: u64 },
}

/// One asynchronous call the runtime accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Create {
        request_id: RequestId,
        info: CreateAnchorInfo,
    },
    SetComponent {
        request_id: RequestId,
        space: SpaceHandle,
        info: ComponentStatusSetInfo,
    },
    Save {
        request_id: RequestId,
        info: SaveInfo,
    },
    Erase {
        request_id: RequestId,
        info: EraseInfo,
    },
    Query {
        request_id: RequestId,
        info: QueryInfo,
    },
}

impl Submission {
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::Create { request_id, .. }
            | Self::SetComponent { request_id, .. }
            | Self::Save { request_id, .. }
            | Self::Erase { request_id, .. }
            | Self::Query { request_id, .. } => *request_id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::SetComponent { .. } => OperationKind::SetComponent,
            Self::Save { .. } => OperationKind::Save,
            Self::Erase { .. } => OperationKind::Erase,
            Self::Query { .. } => OperationKind::Query,
        }
    }
}

#[derive(Debug, Clone)]
struct SimSpace {
    uuid: AnchorId,
    components: Vec<ComponentType>,
    enabled: Capabilities,
    pending: Capabilities,
    location: Option<SpaceLocation>,
}

impl SimSpace {
    fn new(uuid: AnchorId, components: Vec<ComponentType>) -> Self {
        Self {
            uuid,
            components,
            enabled: Capabilities::empty(),
            pending: Capabilities::empty(),
            location: None,
        }
    }
}

#[derive(Debug)]
pub struct SimRuntime {
    mode: SimMode,
    tick: u64,
    next_request_id: u64,
    next_space: u64,
    next_uuid: u128,
    submissions: Vec<Submission>,
    fail_next: Option<ResultCode>,
    spaces: HashMap<SpaceHandle, SimSpace>,
    query_results: HashMap<RequestId, Vec<QueryResult>>,
    /// Anchors persisted by auto-mode saves, with the pose they were saved at.
    stored: IndexMap<AnchorId, Option<SpaceLocation>>,
    scheduled: Vec<(u64, SpatialEvent)>,
    queue: VecDeque<SpatialEvent>,
}

impl SimRuntime {
    #[must_use]
    pub fn new(mode: SimMode) -> Self {
        Self {
            mode,
            tick: 0,
            next_request_id: 1,
            next_space: FIRST_SPACE_HANDLE,
            next_uuid: 1,
            submissions: Vec::new(),
            fail_next: None,
            spaces: HashMap::new(),
            query_results: HashMap::new(),
            stored: IndexMap::new(),
            scheduled: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn manual() -> Self {
        Self::new(SimMode::Manual)
    }

    #[must_use]
    pub fn auto(latency_ticks: u64) -> Self {
        Self::new(SimMode::Auto { latency_ticks })
    }

    #[must_use]
    pub fn mode(&self) -> SimMode {
        self.mode
    }

    /// The id handed out by the next accepted submission.
    pub fn set_next_request_id(&mut self, id: u64) {
        self.next_request_id = id;
    }

    /// Reject the next asynchronous submission with `code`.
    pub fn fail_next_submission(&mut self, code: ResultCode) {
        self.fail_next = Some(code);
    }

    #[must_use]
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    #[must_use]
    pub fn submission_count(&self, kind: OperationKind) -> usize {
        self.submissions.iter().filter(|s| s.kind() == kind).count()
    }

    /// Queue an event for the next poll (manual mode scripting).
    pub fn push_event(&mut self, event: SpatialEvent) {
        self.queue.push_back(event);
    }

    /// Make a space known, supporting `components`.
    pub fn add_space(&mut self, space: SpaceHandle, uuid: AnchorId, components: &[ComponentType]) {
        self.spaces.insert(space, SimSpace::new(uuid, components.to_vec()));
    }

    /// Locate result for `space` on subsequent ticks. Unknown spaces are ignored.
    pub fn set_location(&mut self, space: SpaceHandle, location: SpaceLocation) {
        if let Some(entry) = self.spaces.get_mut(&space) {
            entry.location = Some(location);
        }
    }

    /// Results returned by the two-call retrieval for `request_id`.
    pub fn set_query_results(&mut self, request_id: RequestId, results: Vec<QueryResult>) {
        self.query_results.insert(request_id, results);
    }

    #[must_use]
    pub fn stored_anchors(&self) -> Vec<AnchorId> {
        self.stored.keys().copied().collect()
    }

    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.len() + self.scheduled.len()
    }

    /// Close the current session: live spaces, queued events and query results
    /// are dropped. Stored anchors and id counters survive.
    pub fn end_session(&mut self) {
        self.spaces.clear();
        self.query_results.clear();
        self.scheduled.clear();
        self.queue.clear();
        self.submissions.clear();
        self.fail_next = None;
    }

    /// Move time forward one tick, releasing auto-mode completions that are due.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
        let now = self.tick;
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.scheduled = later;
        for (_, event) in due {
            self.deliver(event);
        }
    }

    fn accept(
        &mut self,
        submission: impl FnOnce(RequestId) -> Submission,
    ) -> Result<RequestId, ResultCode> {
        if let Some(code) = self.fail_next.take() {
            return Err(code);
        }
        let request_id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        self.submissions.push(submission(request_id));
        Ok(request_id)
    }

    fn auto_latency(&self) -> Option<u64> {
        match self.mode {
            SimMode::Manual => None,
            SimMode::Auto { latency_ticks } => Some(latency_ticks),
        }
    }

    fn schedule(&mut self, latency_ticks: u64, event: SpatialEvent) {
        if latency_ticks == 0 {
            self.deliver(event);
        } else {
            self.scheduled.push((self.tick + latency_ticks, event));
        }
    }

    /// Apply an auto-mode completion's side effects and queue it.
    fn deliver(&mut self, event: SpatialEvent) {
        match &event {
            SpatialEvent::ComponentStatusComplete {
                space,
                component,
                enabled,
                ..
            } => {
                if let Some(entry) = self.spaces.get_mut(space) {
                    entry.pending.remove(component.flag());
                    entry.enabled.set_component(*component, *enabled);
                }
            }
            SpatialEvent::SaveComplete { space, uuid, .. } => {
                let location = self.spaces.get(space).and_then(|s| s.location);
                self.stored.insert(*uuid, location);
            }
            SpatialEvent::EraseComplete { uuid, .. } => {
                self.stored.shift_remove(uuid);
            }
            _ => {}
        }
        self.queue.push_back(event);
    }

    fn allocate_space(&mut self) -> (SpaceHandle, AnchorId) {
        let space = SpaceHandle::new(self.next_space);
        self.next_space += 1;
        let uuid = AnchorId::from_u128(self.next_uuid);
        self.next_uuid += 1;
        (space, uuid)
    }

    fn space(&self, space: SpaceHandle) -> Result<&SimSpace, ResultCode> {
        self.spaces.get(&space).ok_or(ResultCode::HandleInvalid)
    }

    fn check_set_component(
        &self,
        space: SpaceHandle,
        info: &ComponentStatusSetInfo,
    ) -> Result<(), ResultCode> {
        let entry = self.space(space)?;
        if !entry.components.contains(&info.component) {
            return Err(ResultCode::ComponentNotSupported);
        }
        if entry.pending.has(info.component) {
            return Err(ResultCode::ComponentStatusPending);
        }
        if entry.enabled.has(info.component) == info.enabled {
            return Err(ResultCode::ComponentStatusAlreadySet);
        }
        Ok(())
    }

    /// Spaces a load query returns: the stored set, reusing live handles.
    fn load_stored(&mut self, max_results: u32) -> Vec<QueryResult> {
        let stored: Vec<(AnchorId, Option<SpaceLocation>)> = self
            .stored
            .iter()
            .take(max_results as usize)
            .map(|(id, loc)| (*id, *loc))
            .collect();

        stored
            .into_iter()
            .map(|(uuid, location)| {
                let live = self
                    .spaces
                    .iter()
                    .find(|(_, s)| s.uuid == uuid)
                    .map(|(handle, _)| *handle);
                let space = live.unwrap_or_else(|| {
                    let (space, _) = self.allocate_space();
                    let mut entry = SimSpace::new(uuid, DEFAULT_COMPONENTS.to_vec());
                    entry.location = location;
                    self.spaces.insert(space, entry);
                    space
                });
                QueryResult {
                    space,
                    uuid: Some(uuid),
                }
            })
            .collect()
    }
}

/// Two-call fill: empty `out` asks for the count.
fn fill<T: Copy>(items: &[T], out: &mut [T]) -> Result<u32, ResultCode> {
    let count = u32::try_from(items.len()).map_err(|_| ResultCode::RuntimeFailure)?;
    if out.is_empty() {
        return Ok(count);
    }
    if out.len() < items.len() {
        return Err(ResultCode::SizeInsufficient);
    }
    out[..items.len()].copy_from_slice(items);
    Ok(count)
}

impl SpatialRuntime for SimRuntime {
    fn create_spatial_anchor(&mut self, info: &CreateAnchorInfo) -> Result<RequestId, ResultCode> {
        let info = *info;
        let request_id = self.accept(|request_id| Submission::Create { request_id, info })?;
        if let Some(latency) = self.auto_latency() {
            let (space, uuid) = self.allocate_space();
            let mut entry = SimSpace::new(uuid, DEFAULT_COMPONENTS.to_vec());
            entry.location = Some(SpaceLocation::new(info.pose, LocationFlags::all()));
            self.spaces.insert(space, entry);
            self.schedule(
                latency,
                SpatialEvent::CreateComplete {
                    request_id,
                    result: ResultCode::Success,
                    space,
                    uuid,
                },
            );
        }
        Ok(request_id)
    }

    fn space_uuid(&mut self, space: SpaceHandle) -> Result<AnchorId, ResultCode> {
        self.space(space).map(|s| s.uuid)
    }

    fn enumerate_supported_components(
        &mut self,
        space: SpaceHandle,
        out: &mut [ComponentType],
    ) -> Result<u32, ResultCode> {
        let entry = self.space(space)?;
        fill(&entry.components, out)
    }

    fn set_component_status(
        &mut self,
        space: SpaceHandle,
        info: &ComponentStatusSetInfo,
    ) -> Result<RequestId, ResultCode> {
        let latency = self.auto_latency();
        if latency.is_some() {
            self.check_set_component(space, info)?;
        }
        let info = *info;
        let request_id = self.accept(|request_id| Submission::SetComponent {
            request_id,
            space,
            info,
        })?;
        if let Some(latency) = latency {
            let uuid = self.space(space)?.uuid;
            if let Some(entry) = self.spaces.get_mut(&space) {
                entry.pending.insert(info.component.flag());
            }
            self.schedule(
                latency,
                SpatialEvent::ComponentStatusComplete {
                    request_id,
                    result: ResultCode::Success,
                    space,
                    uuid,
                    component: info.component,
                    enabled: info.enabled,
                },
            );
        }
        Ok(request_id)
    }

    fn component_status(
        &mut self,
        space: SpaceHandle,
        component: ComponentType,
    ) -> Result<ComponentStatus, ResultCode> {
        let entry = self.space(space)?;
        if !entry.components.contains(&component) {
            return Err(ResultCode::ComponentNotSupported);
        }
        Ok(ComponentStatus {
            enabled: entry.enabled.has(component),
            change_pending: entry.pending.has(component),
        })
    }

    fn save_space(&mut self, info: &SaveInfo) -> Result<RequestId, ResultCode> {
        let latency = self.auto_latency();
        if latency.is_some() && !self.space(info.space)?.enabled.has(ComponentType::Storable) {
            return Err(ResultCode::ComponentNotEnabled);
        }
        let info = *info;
        let request_id = self.accept(|request_id| Submission::Save { request_id, info })?;
        if let Some(latency) = latency {
            let uuid = self.space(info.space)?.uuid;
            self.schedule(
                latency,
                SpatialEvent::SaveComplete {
                    request_id,
                    result: ResultCode::Success,
                    space: info.space,
                    uuid,
                    location: info.location,
                },
            );
        }
        Ok(request_id)
    }

    fn erase_space(&mut self, info: &EraseInfo) -> Result<RequestId, ResultCode> {
        let latency = self.auto_latency();
        if latency.is_some() {
            self.space(info.space)?;
        }
        let info = *info;
        let request_id = self.accept(|request_id| Submission::Erase { request_id, info })?;
        if let Some(latency) = latency {
            let uuid = self.space(info.space)?.uuid;
            self.schedule(
                latency,
                SpatialEvent::EraseComplete {
                    request_id,
                    result: ResultCode::Success,
                    space: info.space,
                    uuid,
                    location: info.location,
                },
            );
        }
        Ok(request_id)
    }

    fn query_spaces(&mut self, info: &QueryInfo) -> Result<RequestId, ResultCode> {
        let info = *info;
        let request_id = self.accept(|request_id| Submission::Query { request_id, info })?;
        if let Some(latency) = self.auto_latency() {
            let results = self.load_stored(info.max_result_count);
            self.query_results.insert(request_id, results);
            self.schedule(latency, SpatialEvent::QueryResultsAvailable { request_id });
            self.schedule(
                latency,
                SpatialEvent::QueryComplete {
                    request_id,
                    result: ResultCode::Success,
                },
            );
        }
        Ok(request_id)
    }

    fn retrieve_query_results(
        &mut self,
        request_id: RequestId,
        out: &mut [QueryResult],
    ) -> Result<u32, ResultCode> {
        let results = self
            .query_results
            .get(&request_id)
            .ok_or(ResultCode::ValidationFailure)?;
        fill(results, out)
    }

    fn locate_space(
        &mut self,
        space: SpaceHandle,
        _base: SpaceHandle,
        _time: Time,
    ) -> Result<SpaceLocation, ResultCode> {
        let entry = self.space(space)?;
        Ok(entry
            .location
            .unwrap_or_else(|| SpaceLocation::new(Pose::IDENTITY, LocationFlags::empty())))
    }

    fn poll_event(&mut self) -> Option<SpatialEvent> {
        self.queue.pop_front()
    }
}

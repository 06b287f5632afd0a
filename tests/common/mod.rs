//! Shared test utilities and fixtures
//!
//! Engines over an auto-mode [`SimRuntime`] plus a continuation recorder.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use tether_engine::{
    AnchorEngine, Completion, Continuation, EngineConfig, EngineError, FrameContext, SpaceHandle,
    SpatialSupport, TickReport, Time, sim::SimRuntime,
};

pub const REFERENCE: SpaceHandle = SpaceHandle::new(1);

/// Completion latency used by the auto-mode fixtures.
pub const LATENCY: u64 = 2;

pub fn frame(tick: u64) -> FrameContext {
    FrameContext::new(REFERENCE, Time::from_nanos(tick as i64 * 16_000_000))
}

pub fn auto_engine(config: EngineConfig) -> AnchorEngine<SimRuntime> {
    AnchorEngine::new(SimRuntime::auto(LATENCY), SpatialSupport::all(), config)
}

/// Advance the runtime and tick the engine `n` times.
pub fn run_ticks(engine: &mut AnchorEngine<SimRuntime>, n: u64) -> Vec<TickReport> {
    (0..n)
        .map(|_| {
            engine.runtime_mut().advance_tick();
            let next = engine.current_tick() + 1;
            engine.tick(frame(next))
        })
        .collect()
}

/// Tick until nothing is pending, up to `limit` ticks.
pub fn settle(engine: &mut AnchorEngine<SimRuntime>, limit: u64) {
    for _ in 0..limit {
        if engine.pending_requests() == 0 && engine.runtime().pending_events() == 0 {
            return;
        }
        run_ticks(engine, 1);
    }
    panic!(
        "engine did not settle: {} request(s) pending",
        engine.pending_requests()
    );
}

/// Records every continuation invocation.
#[derive(Clone, Default)]
pub struct Recorder {
    successes: Rc<RefCell<Vec<Completion>>>,
    failures: Rc<RefCell<Vec<EngineError>>>,
}

impl Recorder {
    pub fn continuation(&self) -> Continuation {
        let ok = Rc::clone(&self.successes);
        let err = Rc::clone(&self.failures);
        Continuation::none()
            .on_success(move |c| ok.borrow_mut().push(c))
            .on_failure(move |e| err.borrow_mut().push(e))
    }

    pub fn successes(&self) -> Vec<Completion> {
        self.successes.borrow().clone()
    }

    pub fn failures(&self) -> Vec<EngineError> {
        self.failures.borrow().clone()
    }
}

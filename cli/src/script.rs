//! Tick-keyed actions for the demo sessions.

use tether_engine::{
    Anchor, AnchorEngine, Completion, Continuation, EngineError, FrameContext, Pose, sim::SimRuntime,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Create(Pose),
    /// Erase the oldest registered anchor, if any.
    EraseFirst,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    at_tick: u64,
    action: Action,
}

impl Step {
    pub fn create(at_tick: u64, x: f32, y: f32, z: f32) -> Self {
        Self {
            at_tick,
            action: Action::Create(Pose::at(x, y, z)),
        }
    }

    pub fn erase_first(at_tick: u64) -> Self {
        Self {
            at_tick,
            action: Action::EraseFirst,
        }
    }
}

#[derive(Debug, Default)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Submit every step scheduled for `tick`. Applied steps are removed.
    pub fn apply_due(
        &mut self,
        engine: &mut AnchorEngine<SimRuntime>,
        tick: u64,
        frame: FrameContext,
    ) -> Result<(), EngineError> {
        let (due, later): (Vec<Step>, Vec<Step>) =
            self.steps.drain(..).partition(|s| s.at_tick == tick);
        self.steps = later;

        for step in due {
            match step.action {
                Action::Create(pose) => {
                    let continuation = Continuation::none()
                        .on_success(|completion| {
                            if let Completion::Created { id, space } = completion {
                                tracing::info!(anchor = %id, handle = %space, "Placed anchor");
                            }
                        })
                        .on_failure(|e| tracing::warn!(error = %e, "Anchor placement failed"));
                    engine.create_anchor(pose, frame, continuation)?;
                }
                Action::EraseFirst => {
                    let Some(first) = engine.anchors().first().map(Anchor::id) else {
                        tracing::info!("Nothing to erase");
                        continue;
                    };
                    let continuation = Continuation::none()
                        .on_success(|_| tracing::info!("Anchor erased from storage"));
                    engine.erase_anchor(first, continuation)?;
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

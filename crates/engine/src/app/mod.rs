mod input;
mod loop_runner;
mod metrics;
mod world;

pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{
    run_fixed_loop, AppError, IdleInput, InputSource, LoopConfig, LoopSummary, Simulation,
    TickControl,
};
pub use metrics::TickTimings;
pub use world::{EntityId, EntityIdAllocator, EntityStore, Rect, Vec2};

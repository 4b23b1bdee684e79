pub mod loop_control;
pub mod polling;
pub mod state;

pub use polling::PollingResolver;
pub use state::{Resolution, ResolveState, WaitMode};

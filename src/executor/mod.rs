pub mod coordinator;
pub mod dispatcher;

pub use coordinator::{scale_point, Destination, SwipeDirection, Target};
pub use dispatcher::InteractionDispatcher;

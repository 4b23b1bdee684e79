pub mod config;
pub mod driver;
pub mod errors;
pub mod executor;
pub mod perception;
pub mod pom;
pub mod query;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use config::{load_config, load_config_from, CvPomConfig};
pub use driver::{ClickSpec, Driver, MouseButton};
pub use errors::{CvPomError, CvPomResult};
pub use executor::{Destination, InteractionDispatcher, SwipeDirection, Target};
pub use perception::{
    BBox, Detection, Detector, Element, ElementRegistry, OcrOptions, Perception, Point,
    TextRecognizer, TextRegion,
};
pub use pom::{ClickOptions, CvPomDriver, DriverElement, Page};
pub use query::{Query, QueryValue};
pub use resolver::{PollingResolver, Resolution, WaitMode};

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

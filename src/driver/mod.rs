#[cfg(feature = "desktop")]
pub mod desktop;
pub mod traits;

#[cfg(feature = "desktop")]
pub use desktop::DesktopDriver;
pub use traits::{ClickSpec, Driver, MouseButton};

pub mod driver;
pub mod element;
pub mod page;

pub use driver::CvPomDriver;
pub use element::{ClickOptions, DriverElement};
pub use page::Page;

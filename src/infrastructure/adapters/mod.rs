//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

mod locator;
pub mod media;
pub mod probe;
pub mod synthesis;

pub use locator::{is_remote, AssetLocator};
pub use media::*;
pub use probe::*;
pub use synthesis::*;

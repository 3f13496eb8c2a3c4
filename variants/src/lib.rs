pub mod image;
pub mod memory;
pub mod multi_core;
pub mod registry;
pub mod single_core;
pub mod system;

pub use image::{ImageLoadError, MemoryImage};
pub use multi_core::MultiCoreSystem;
pub use single_core::SingleCoreSystem;
pub use system::System;

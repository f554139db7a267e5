pub mod bloom;
pub mod common;
mod gpu;
mod headless;
mod overlay;
mod shared;

pub use gpu::{GpuFrame, Renderer};
pub use headless::{HeadlessBackend, HeadlessFrame};
pub use overlay::Overlay;

pub mod frame;
pub mod sampler;
pub mod source;
pub mod store;

pub use frame::{DecodedFrame, FrameRecord};
pub use sampler::{FrameSampler, DEFAULT_STRIDE};
pub use source::{FfmpegSource, InMemorySource, VideoSource};
pub use store::{DiskFrameStore, FrameStore};

//! ktx2-transcode - KTX2 texture loading
//!
//! Turns KTX 2.0 containers into GPU-ready texture descriptions. Basis
//! Universal payloads are transcoded on a bounded pool of execution units to
//! the best compressed format the device supports; raw Vulkan-format payloads
//! are decoded directly.

pub mod cache;
pub mod color;
pub mod config;
pub mod container;
pub mod error;
pub mod formats;
pub mod loader;
pub mod pool;
pub mod raw;
pub mod source;
pub mod texture;
pub mod transcode;

#[cfg(test)]
mod testing;

pub use cache::TaskCache;
pub use color::{resolve_color_space, ColorSpace};
pub use config::{CapabilityProfile, LoaderConfig};
pub use container::{ContainerParser, DataFormatDescriptor, Ktx2Container, Ktx2Level};
pub use error::{ConfigError, LoadError};
pub use formats::{BasisFormat, DataType, EngineFormat, TranscoderFormat};
pub use loader::Ktx2Loader;
pub use pool::{TranscoderBootstrap, WorkerPool};
pub use raw::{SupercompressionDecoder, ZstdDecoder};
pub use source::SourceBuffer;
pub use texture::{Diagnostic, Filter, MipLevel, PixelData, TextureDescription, TextureFace, TextureKind};
pub use transcode::{Transcoder, TranscoderFile, TranscoderModule};

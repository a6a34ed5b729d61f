//! Basis Universal codec interface
//!
//! The transcoder itself lives outside this crate. A [`TranscoderModule`] is
//! the shared, process-wide part (compiled code, tables); every execution
//! unit instantiates its own [`Transcoder`] from it and opens one
//! [`TranscoderFile`] per task.

use anyhow::Result;

use crate::formats::TranscoderFormat;

/// Dimensions of one image inside a KTX2 file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageLevelInfo {
    /// Dimensions before padding to whole blocks
    pub orig_width: u32,
    pub orig_height: u32,
    /// Dimensions rounded up to whole 4x4 blocks
    pub width: u32,
    pub height: u32,
}

/// Shared codec runtime, instantiated once per execution unit
pub trait TranscoderModule: Send + Sync + 'static {
    /// Create a codec instance; runs on the execution unit's own thread
    fn instantiate(&self) -> Result<Box<dyn Transcoder>>;
}

impl<F> TranscoderModule for F
where
    F: Fn() -> Result<Box<dyn Transcoder>> + Send + Sync + 'static,
{
    fn instantiate(&self) -> Result<Box<dyn Transcoder>> {
        self()
    }
}

/// Codec instance owned by a single execution unit
pub trait Transcoder {
    /// Open a KTX2 file. Dropping the returned file closes it.
    fn open<'a>(&'a mut self, data: &'a [u8]) -> Box<dyn TranscoderFile + 'a>;
}

/// An opened KTX2 file
pub trait TranscoderFile {
    fn is_valid(&self) -> bool;
    fn is_uastc(&self) -> bool;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// 0 for non-array textures
    fn layers(&self) -> u32;
    fn levels(&self) -> u32;
    fn faces(&self) -> u32;
    fn has_alpha(&self) -> bool;
    fn dfd_flags(&self) -> u32;
    fn start_transcoding(&mut self) -> bool;
    fn image_level_info(&self, mip: u32, layer: u32, face: u32) -> ImageLevelInfo;
    fn transcoded_size(&self, mip: u32, layer: u32, target: TranscoderFormat) -> usize;
    fn transcode_image(
        &mut self,
        dst: &mut [u8],
        mip: u32,
        layer: u32,
        face: u32,
        target: TranscoderFormat,
    ) -> bool;
}

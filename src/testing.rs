//! Test fixtures
//!
//! Fake textures are serialized as JSON so a single byte buffer can drive
//! both the fake container parser and the fake codec.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::container::{
    ContainerParser, DataFormatDescriptor, Ktx2Container, Ktx2Level, KHR_DF_PRIMARIES_BT709,
    KHR_DF_TRANSFER_SRGB, KHR_SUPERCOMPRESSION_NONE, VK_FORMAT_UNDEFINED,
};
use crate::formats::TranscoderFormat;
use crate::source::SourceBuffer;
use crate::transcode::{ImageLevelInfo, Transcoder, TranscoderFile, TranscoderModule};

/// Description of a fake KTX2 file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeTexture {
    pub vk_format: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub levels: u32,
    pub layers: u32,
    pub faces: u32,
    pub uastc: bool,
    pub has_alpha: bool,
    pub dfd_flags: u32,
    pub color_primaries: u32,
    pub transfer_function: u32,
    pub supercompression_scheme: u32,
    /// Raw-path level payloads
    pub level_data: Vec<Vec<u8>>,
    pub uncompressed_lengths: Vec<u64>,
    pub valid: bool,
    pub fail_start: bool,
    pub fail_transcode: bool,
    pub panic: bool,
    /// Time spent in start_transcoding, to keep a unit busy
    pub delay_ms: u64,
    /// Distinguishes otherwise identical fixtures
    pub tag: String,
}

impl Default for FakeTexture {
    fn default() -> Self {
        Self {
            vk_format: VK_FORMAT_UNDEFINED,
            width: 0,
            height: 0,
            depth: 0,
            levels: 1,
            layers: 0,
            faces: 1,
            uastc: false,
            has_alpha: false,
            dfd_flags: 0,
            color_primaries: KHR_DF_PRIMARIES_BT709,
            transfer_function: KHR_DF_TRANSFER_SRGB,
            supercompression_scheme: KHR_SUPERCOMPRESSION_NONE,
            level_data: Vec::new(),
            uncompressed_lengths: Vec::new(),
            valid: true,
            fail_start: false,
            fail_transcode: false,
            panic: false,
            delay_ms: 0,
            tag: String::new(),
        }
    }
}

impl FakeTexture {
    /// Single-level ETC1S texture
    pub fn basis(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Raw texture with uncompressed level payloads
    pub fn raw(vk_format: u32, width: u32, height: u32, level_data: Vec<Vec<u8>>) -> Self {
        let uncompressed_lengths = level_data.iter().map(|l| l.len() as u64).collect();
        Self {
            vk_format,
            width,
            height,
            levels: level_data.len() as u32,
            level_data,
            uncompressed_lengths,
            ..Self::default()
        }
    }

    pub fn tagged(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap()
    }

    pub fn to_buffer(&self) -> SourceBuffer {
        SourceBuffer::new(self.to_bytes())
    }

    /// Transcoded size of one image in the given target
    pub fn block_bytes(width: u32, height: u32, target: TranscoderFormat) -> usize {
        let blocks = (width.div_ceil(4) * height.div_ceil(4)) as usize;
        match target {
            TranscoderFormat::Rgba32 => (width * height * 4) as usize,
            TranscoderFormat::Etc1
            | TranscoderFormat::Bc1
            | TranscoderFormat::Bc4
            | TranscoderFormat::Pvrtc14Rgb
            | TranscoderFormat::Pvrtc14Rgba
            | TranscoderFormat::AtcRgb => blocks * 8,
            TranscoderFormat::Rgb565 | TranscoderFormat::Bgr565 | TranscoderFormat::Rgba4444 => {
                (width * height * 2) as usize
            }
            _ => blocks * 16,
        }
    }
}

/// Parser for JSON-encoded [`FakeTexture`]s
#[derive(Debug, Default, Clone)]
pub struct FakeParser;

impl ContainerParser for FakeParser {
    fn parse(&self, data: &[u8]) -> Result<Ktx2Container> {
        let fake: FakeTexture =
            serde_json::from_slice(data).context("not a fake KTX2 container")?;

        let levels = if fake.level_data.is_empty() {
            (0..fake.levels).map(|_| Ktx2Level::default()).collect()
        } else {
            fake.level_data
                .iter()
                .zip(fake.uncompressed_lengths.iter().chain(std::iter::repeat(&0)))
                .map(|(data, len)| Ktx2Level {
                    level_data: data.clone(),
                    uncompressed_byte_length: *len,
                })
                .collect()
        };

        Ok(Ktx2Container {
            vk_format: fake.vk_format,
            pixel_width: fake.width,
            pixel_height: fake.height,
            pixel_depth: fake.depth,
            layer_count: fake.layers,
            face_count: fake.faces,
            supercompression_scheme: fake.supercompression_scheme,
            levels,
            data_format_descriptor: vec![DataFormatDescriptor {
                color_primaries: fake.color_primaries,
                transfer_function: fake.transfer_function,
                flags: fake.dfd_flags,
            }],
        })
    }
}

/// Counters shared by every codec instance of a [`FakeModule`]
#[derive(Debug, Default)]
pub struct FakeStats {
    pub instances: AtomicUsize,
    pub transcodes: AtomicUsize,
}

impl FakeStats {
    pub fn instances(&self) -> usize {
        self.instances.load(Ordering::SeqCst)
    }

    pub fn transcodes(&self) -> usize {
        self.transcodes.load(Ordering::SeqCst)
    }
}

/// Codec runtime producing deterministic fake block data
#[derive(Debug, Default, Clone)]
pub struct FakeModule {
    pub stats: Arc<FakeStats>,
    pub fail_instantiate: bool,
}

impl TranscoderModule for FakeModule {
    fn instantiate(&self) -> Result<Box<dyn Transcoder>> {
        if self.fail_instantiate {
            anyhow::bail!("transcoder binary is corrupt");
        }
        self.stats.instances.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeTranscoder {
            stats: self.stats.clone(),
        }))
    }
}

struct FakeTranscoder {
    stats: Arc<FakeStats>,
}

impl Transcoder for FakeTranscoder {
    fn open<'a>(&'a mut self, data: &'a [u8]) -> Box<dyn TranscoderFile + 'a> {
        Box::new(FakeFile {
            texture: serde_json::from_slice(data).ok(),
            stats: &*self.stats,
        })
    }
}

struct FakeFile<'a> {
    texture: Option<FakeTexture>,
    stats: &'a FakeStats,
}

impl FakeFile<'_> {
    fn texture(&self) -> &FakeTexture {
        self.texture.as_ref().expect("checked by is_valid")
    }

    fn level_dims(&self, mip: u32) -> (u32, u32) {
        let t = self.texture();
        ((t.width >> mip).max(1), (t.height >> mip).max(1))
    }
}

impl TranscoderFile for FakeFile<'_> {
    fn is_valid(&self) -> bool {
        self.texture.as_ref().is_some_and(|t| t.valid)
    }

    fn is_uastc(&self) -> bool {
        self.texture().uastc
    }

    fn width(&self) -> u32 {
        self.texture().width
    }

    fn height(&self) -> u32 {
        self.texture().height
    }

    fn layers(&self) -> u32 {
        self.texture().layers
    }

    fn levels(&self) -> u32 {
        self.texture().levels
    }

    fn faces(&self) -> u32 {
        self.texture().faces
    }

    fn has_alpha(&self) -> bool {
        self.texture().has_alpha
    }

    fn dfd_flags(&self) -> u32 {
        self.texture().dfd_flags
    }

    fn start_transcoding(&mut self) -> bool {
        let t = self.texture();
        if t.panic {
            panic!("codec crashed");
        }
        if t.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(t.delay_ms));
        }
        self.stats.transcodes.fetch_add(1, Ordering::SeqCst);
        !t.fail_start
    }

    fn image_level_info(&self, mip: u32, _layer: u32, _face: u32) -> ImageLevelInfo {
        let (w, h) = self.level_dims(mip);
        ImageLevelInfo {
            orig_width: w,
            orig_height: h,
            width: w.div_ceil(4) * 4,
            height: h.div_ceil(4) * 4,
        }
    }

    fn transcoded_size(&self, mip: u32, _layer: u32, target: TranscoderFormat) -> usize {
        let (w, h) = self.level_dims(mip);
        FakeTexture::block_bytes(w, h, target)
    }

    fn transcode_image(
        &mut self,
        dst: &mut [u8],
        mip: u32,
        layer: u32,
        face: u32,
        _target: TranscoderFormat,
    ) -> bool {
        if self.texture().fail_transcode {
            return false;
        }
        dst.fill((face * 16 + mip * 4 + layer) as u8);
        true
    }
}

/// Install a test subscriber once; honours RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

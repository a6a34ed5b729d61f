//! GPU-ready texture description
//!
//! This is the loader's output: everything a renderer needs to create and
//! upload a texture, without touching a GPU API.

use crate::color::ColorSpace;
use crate::formats::{DataType, EngineFormat};

/// Shape of the texture object to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    Texture2D,
    /// Six faces, one mip chain each
    Cube,
    /// Layers are concatenated inside each mip level
    Array { layers: u32 },
    Volume { depth: u32 },
}

/// Sampling filter hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Linear,
    LinearMipmapLinear,
}

impl Filter {
    /// Minification filter for a mip chain of the given length
    pub fn for_mip_count(count: usize) -> Self {
        if count <= 1 {
            Filter::Linear
        } else {
            Filter::LinearMipmapLinear
        }
    }
}

/// Pixel storage reinterpreted to match [`DataType`]
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    /// Half floats, stored as raw bits
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl PixelData {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len(),
            PixelData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len() * 2,
            PixelData::F32(v) => v.len() * 4,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PixelData::U8(v) => Some(v),
            _ => None,
        }
    }
}

/// One mip level of one face
#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    pub data: PixelData,
    pub width: u32,
    pub height: u32,
    /// 0 for textures without a depth dimension
    pub depth: u32,
}

/// Mip chain of a single face
#[derive(Debug, Clone, PartialEq)]
pub struct TextureFace {
    pub mipmaps: Vec<MipLevel>,
}

/// Non-fatal conditions noticed while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// No compressed format matched the device; decoded to RGBA32
    UncompressedFallback,
    /// DFD primaries outside BT.709 / Display P3 / unspecified
    UnsupportedColorPrimaries(u32),
    /// Basis textures should use multiple-of-four dimensions
    NonMultipleOfFour { width: u32, height: u32 },
    /// Another loader with its own pool was already active
    MultipleActiveLoaders,
}

/// Texture ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescription {
    pub kind: TextureKind,
    pub format: EngineFormat,
    pub data_type: DataType,
    pub width: u32,
    pub height: u32,
    /// One entry per face (six for cube maps)
    pub faces: Vec<TextureFace>,
    pub min_filter: Filter,
    pub mag_filter: Filter,
    /// Mips come from the file and must not be regenerated
    pub generate_mipmaps: bool,
    pub premultiply_alpha: bool,
    pub color_space: ColorSpace,
    pub diagnostics: Vec<Diagnostic>,
}

impl TextureDescription {
    /// Mip chain of the first face
    pub fn mipmaps(&self) -> &[MipLevel] {
        self.faces
            .first()
            .map(|face| face.mipmaps.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_diagnostic(&self, diagnostic: &Diagnostic) -> bool {
        self.diagnostics.contains(diagnostic)
    }

    /// Matching wgpu format, if wgpu can sample it
    ///
    /// ETC1 data is valid ETC2 RGB8, so it maps onto the ETC2 format.
    /// wgpu has no PVRTC support.
    pub fn wgpu_format(&self) -> Option<wgpu::TextureFormat> {
        use wgpu::{AstcBlock, AstcChannel, TextureFormat as Tf};

        let srgb = self.color_space.is_srgb_transfer();
        let astc_channel = if srgb {
            AstcChannel::UnormSrgb
        } else {
            AstcChannel::Unorm
        };
        let pick = |linear: Tf, encoded: Tf| if srgb { encoded } else { linear };

        let format = match (self.format, self.data_type) {
            (EngineFormat::Rgba, DataType::UnsignedByte) => {
                pick(Tf::Rgba8Unorm, Tf::Rgba8UnormSrgb)
            }
            (EngineFormat::Rgba, DataType::HalfFloat) => Tf::Rgba16Float,
            (EngineFormat::Rgba, DataType::Float) => Tf::Rgba32Float,
            (EngineFormat::Rg, DataType::UnsignedByte) => Tf::Rg8Unorm,
            (EngineFormat::Rg, DataType::HalfFloat) => Tf::Rg16Float,
            (EngineFormat::Rg, DataType::Float) => Tf::Rg32Float,
            (EngineFormat::Red, DataType::UnsignedByte) => Tf::R8Unorm,
            (EngineFormat::Red, DataType::HalfFloat) => Tf::R16Float,
            (EngineFormat::Red, DataType::Float) => Tf::R32Float,
            (EngineFormat::RgbaAstc4x4, _) => Tf::Astc {
                block: AstcBlock::B4x4,
                channel: astc_channel,
            },
            (EngineFormat::RgbaAstc6x6, _) => Tf::Astc {
                block: AstcBlock::B6x6,
                channel: astc_channel,
            },
            (EngineFormat::RgbaBptc, _) => pick(Tf::Bc7RgbaUnorm, Tf::Bc7RgbaUnormSrgb),
            (EngineFormat::RgbS3tcDxt1, _) => pick(Tf::Bc1RgbaUnorm, Tf::Bc1RgbaUnormSrgb),
            (EngineFormat::RgbaS3tcDxt5, _) => pick(Tf::Bc3RgbaUnorm, Tf::Bc3RgbaUnormSrgb),
            (EngineFormat::RgbEtc1 | EngineFormat::RgbEtc2, _) => {
                pick(Tf::Etc2Rgb8Unorm, Tf::Etc2Rgb8UnormSrgb)
            }
            (EngineFormat::RgbaEtc2Eac, _) => pick(Tf::Etc2Rgba8Unorm, Tf::Etc2Rgba8UnormSrgb),
            (EngineFormat::RgbPvrtc4bppv1 | EngineFormat::RgbaPvrtc4bppv1, _) => return None,
        };
        Some(format)
    }
}

//! Format identifiers
//!
//! Three vocabularies meet here: the Basis source encoding, the transcoder's
//! target identifiers, and the engine formats the renderer uploads.

/// Basis Universal source encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasisFormat {
    Etc1s,
    Uastc4x4,
}

impl BasisFormat {
    pub fn name(&self) -> &'static str {
        match self {
            BasisFormat::Etc1s => "ETC1S",
            BasisFormat::Uastc4x4 => "UASTC_4x4",
        }
    }
}

/// Basis Universal `transcoder_texture_format` targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TranscoderFormat {
    Etc1 = 0,
    Etc2 = 1,
    Bc1 = 2,
    Bc3 = 3,
    Bc4 = 4,
    Bc5 = 5,
    Bc7M6OpaqueOnly = 6,
    Bc7M5 = 7,
    Pvrtc14Rgb = 8,
    Pvrtc14Rgba = 9,
    Astc4x4 = 10,
    AtcRgb = 11,
    AtcRgbaInterpolatedAlpha = 12,
    Rgba32 = 13,
    Rgb565 = 14,
    Bgr565 = 15,
    Rgba4444 = 16,
}

impl TranscoderFormat {
    /// Numeric id understood by the Basis transcoder
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Get format name for logging
    pub fn name(&self) -> &'static str {
        match self {
            TranscoderFormat::Etc1 => "ETC1",
            TranscoderFormat::Etc2 => "ETC2",
            TranscoderFormat::Bc1 => "BC1",
            TranscoderFormat::Bc3 => "BC3",
            TranscoderFormat::Bc4 => "BC4",
            TranscoderFormat::Bc5 => "BC5",
            TranscoderFormat::Bc7M6OpaqueOnly => "BC7_M6_OPAQUE_ONLY",
            TranscoderFormat::Bc7M5 => "BC7_M5",
            TranscoderFormat::Pvrtc14Rgb => "PVRTC1_4_RGB",
            TranscoderFormat::Pvrtc14Rgba => "PVRTC1_4_RGBA",
            TranscoderFormat::Astc4x4 => "ASTC_4x4",
            TranscoderFormat::AtcRgb => "ATC_RGB",
            TranscoderFormat::AtcRgbaInterpolatedAlpha => "ATC_RGBA_INTERPOLATED_ALPHA",
            TranscoderFormat::Rgba32 => "RGBA32",
            TranscoderFormat::Rgb565 => "RGB565",
            TranscoderFormat::Bgr565 => "BGR565",
            TranscoderFormat::Rgba4444 => "RGBA4444",
        }
    }
}

/// Formats the rendering backend understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineFormat {
    /// Uncompressed 4 channels
    Rgba,
    /// Uncompressed 2 channels
    Rg,
    /// Uncompressed single channel
    Red,
    RgbaAstc4x4,
    RgbaAstc6x6,
    RgbaBptc,
    RgbaEtc2Eac,
    RgbaPvrtc4bppv1,
    RgbaS3tcDxt5,
    RgbEtc1,
    RgbEtc2,
    RgbPvrtc4bppv1,
    RgbS3tcDxt1,
}

impl EngineFormat {
    /// Block-compressed formats are uploaded as compressed textures
    pub fn is_compressed(&self) -> bool {
        !matches!(self, EngineFormat::Rgba | EngineFormat::Rg | EngineFormat::Red)
    }

    /// Get format name for logging
    pub fn name(&self) -> &'static str {
        match self {
            EngineFormat::Rgba => "RGBA",
            EngineFormat::Rg => "RG",
            EngineFormat::Red => "RED",
            EngineFormat::RgbaAstc4x4 => "RGBA_ASTC_4x4",
            EngineFormat::RgbaAstc6x6 => "RGBA_ASTC_6x6",
            EngineFormat::RgbaBptc => "RGBA_BPTC",
            EngineFormat::RgbaEtc2Eac => "RGBA_ETC2_EAC",
            EngineFormat::RgbaPvrtc4bppv1 => "RGBA_PVRTC_4BPPV1",
            EngineFormat::RgbaS3tcDxt5 => "RGBA_S3TC_DXT5",
            EngineFormat::RgbEtc1 => "RGB_ETC1",
            EngineFormat::RgbEtc2 => "RGB_ETC2",
            EngineFormat::RgbPvrtc4bppv1 => "RGB_PVRTC_4BPPV1",
            EngineFormat::RgbS3tcDxt1 => "RGB_S3TC_DXT1",
        }
    }
}

/// Element type of uploaded pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    UnsignedByte,
    HalfFloat,
    Float,
}

impl DataType {
    /// Bytes per element
    pub fn size(&self) -> usize {
        match self {
            DataType::UnsignedByte => 1,
            DataType::HalfFloat => 2,
            DataType::Float => 4,
        }
    }
}

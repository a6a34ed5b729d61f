//! KTX2 container model
//!
//! The binary layout is parsed by an external [`ContainerParser`]; this
//! module only defines the structure the rest of the crate consumes and the
//! Khronos enumerants it branches on.

use anyhow::Result;

/// `VK_FORMAT_UNDEFINED` marks Basis Universal payloads
pub const VK_FORMAT_UNDEFINED: u32 = 0;
pub const VK_FORMAT_R8_UNORM: u32 = 9;
pub const VK_FORMAT_R8_SRGB: u32 = 15;
pub const VK_FORMAT_R8G8_UNORM: u32 = 16;
pub const VK_FORMAT_R8G8_SRGB: u32 = 22;
pub const VK_FORMAT_R8G8B8A8_UNORM: u32 = 37;
pub const VK_FORMAT_R8G8B8A8_SRGB: u32 = 43;
pub const VK_FORMAT_R16_SFLOAT: u32 = 76;
pub const VK_FORMAT_R16G16_SFLOAT: u32 = 83;
pub const VK_FORMAT_R16G16B16A16_SFLOAT: u32 = 97;
pub const VK_FORMAT_R32_SFLOAT: u32 = 100;
pub const VK_FORMAT_R32G32_SFLOAT: u32 = 103;
pub const VK_FORMAT_R32G32B32A32_SFLOAT: u32 = 109;
pub const VK_FORMAT_ASTC_6X6_UNORM_BLOCK: u32 = 165;
pub const VK_FORMAT_ASTC_6X6_SRGB_BLOCK: u32 = 166;

pub const KHR_SUPERCOMPRESSION_NONE: u32 = 0;
pub const KHR_SUPERCOMPRESSION_BASISLZ: u32 = 1;
pub const KHR_SUPERCOMPRESSION_ZSTD: u32 = 2;
pub const KHR_SUPERCOMPRESSION_ZLIB: u32 = 3;

pub const KHR_DF_PRIMARIES_UNSPECIFIED: u32 = 0;
pub const KHR_DF_PRIMARIES_BT709: u32 = 1;
pub const KHR_DF_PRIMARIES_DISPLAYP3: u32 = 10;

pub const KHR_DF_TRANSFER_LINEAR: u32 = 1;
pub const KHR_DF_TRANSFER_SRGB: u32 = 2;

pub const KHR_DF_FLAG_ALPHA_PREMULTIPLIED: u32 = 1;

/// One mip level as stored in the file
#[derive(Debug, Clone, Default)]
pub struct Ktx2Level {
    /// Level bytes, possibly supercompressed
    pub level_data: Vec<u8>,
    /// Size after supercompression is removed
    pub uncompressed_byte_length: u64,
}

/// Basic data format descriptor block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataFormatDescriptor {
    pub color_primaries: u32,
    pub transfer_function: u32,
    pub flags: u32,
}

/// Parsed KTX2 container
#[derive(Debug, Clone, Default)]
pub struct Ktx2Container {
    pub vk_format: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// 0 for textures without a depth dimension
    pub pixel_depth: u32,
    pub layer_count: u32,
    pub face_count: u32,
    pub supercompression_scheme: u32,
    pub levels: Vec<Ktx2Level>,
    pub data_format_descriptor: Vec<DataFormatDescriptor>,
}

impl Ktx2Container {
    /// Basis Universal payloads need a transcode step; everything else is raw pixels
    pub fn is_transcodable(&self) -> bool {
        self.vk_format == VK_FORMAT_UNDEFINED
    }

    /// First DFD block, or an unspecified descriptor when the file has none
    pub fn descriptor(&self) -> DataFormatDescriptor {
        self.data_format_descriptor
            .first()
            .copied()
            .unwrap_or_default()
    }

    pub fn is_cube(&self) -> bool {
        self.face_count == 6
    }
}

/// Parses the KTX2 binary layout into a [`Ktx2Container`]
pub trait ContainerParser: Send + Sync + 'static {
    fn parse(&self, data: &[u8]) -> Result<Ktx2Container>;
}

impl<F> ContainerParser for F
where
    F: Fn(&[u8]) -> Result<Ktx2Container> + Send + Sync + 'static,
{
    fn parse(&self, data: &[u8]) -> Result<Ktx2Container> {
        self(data)
    }
}

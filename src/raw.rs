//! Raw pixel path
//!
//! KTX2 files with a concrete Vulkan format carry pixel data the GPU can use
//! directly, optionally Zstandard-supercompressed per level. Levels are
//! decoded in parallel and reinterpreted to match the format's data type.

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::debug;

use crate::color::resolve_color_space;
use crate::container::{
    Ktx2Container, Ktx2Level, KHR_DF_FLAG_ALPHA_PREMULTIPLIED, KHR_SUPERCOMPRESSION_NONE,
    KHR_SUPERCOMPRESSION_ZSTD, VK_FORMAT_ASTC_6X6_SRGB_BLOCK, VK_FORMAT_ASTC_6X6_UNORM_BLOCK,
    VK_FORMAT_R16G16B16A16_SFLOAT, VK_FORMAT_R16G16_SFLOAT, VK_FORMAT_R16_SFLOAT,
    VK_FORMAT_R32G32B32A32_SFLOAT, VK_FORMAT_R32G32_SFLOAT, VK_FORMAT_R32_SFLOAT,
    VK_FORMAT_R8G8B8A8_SRGB, VK_FORMAT_R8G8B8A8_UNORM, VK_FORMAT_R8G8_SRGB, VK_FORMAT_R8G8_UNORM,
    VK_FORMAT_R8_SRGB, VK_FORMAT_R8_UNORM,
};
use crate::error::LoadError;
use crate::formats::{DataType, EngineFormat};
use crate::texture::{Filter, MipLevel, PixelData, TextureDescription, TextureFace, TextureKind};

/// Decoder for supercompressed level data
pub trait SupercompressionDecoder: Send + Sync + 'static {
    /// Decode one level; `expected_len` is the level's uncompressed size, or
    /// 0 when the file does not record it
    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>>;
}

/// Zstandard decoder backed by libzstd
#[derive(Debug, Default, Clone, Copy)]
pub struct ZstdDecoder;

impl SupercompressionDecoder for ZstdDecoder {
    fn decode(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
        if expected_len == 0 {
            return zstd::decode_all(data).context("Zstandard stream is corrupt");
        }

        let decoded =
            zstd::bulk::decompress(data, expected_len).context("Zstandard stream is corrupt")?;
        if decoded.len() != expected_len {
            anyhow::bail!(
                "Zstandard level decoded to {} bytes, expected {}",
                decoded.len(),
                expected_len
            );
        }
        Ok(decoded)
    }
}

/// Engine format and data type for a Vulkan format
pub fn raw_format(vk_format: u32) -> Option<(EngineFormat, DataType)> {
    let mapped = match vk_format {
        VK_FORMAT_R32G32B32A32_SFLOAT => (EngineFormat::Rgba, DataType::Float),
        VK_FORMAT_R16G16B16A16_SFLOAT => (EngineFormat::Rgba, DataType::HalfFloat),
        VK_FORMAT_R8G8B8A8_UNORM | VK_FORMAT_R8G8B8A8_SRGB => {
            (EngineFormat::Rgba, DataType::UnsignedByte)
        }
        VK_FORMAT_R32G32_SFLOAT => (EngineFormat::Rg, DataType::Float),
        VK_FORMAT_R16G16_SFLOAT => (EngineFormat::Rg, DataType::HalfFloat),
        VK_FORMAT_R8G8_UNORM | VK_FORMAT_R8G8_SRGB => (EngineFormat::Rg, DataType::UnsignedByte),
        VK_FORMAT_R32_SFLOAT => (EngineFormat::Red, DataType::Float),
        VK_FORMAT_R16_SFLOAT => (EngineFormat::Red, DataType::HalfFloat),
        VK_FORMAT_R8_UNORM | VK_FORMAT_R8_SRGB => (EngineFormat::Red, DataType::UnsignedByte),
        VK_FORMAT_ASTC_6X6_UNORM_BLOCK | VK_FORMAT_ASTC_6X6_SRGB_BLOCK => {
            (EngineFormat::RgbaAstc6x6, DataType::UnsignedByte)
        }
        _ => return None,
    };
    Some(mapped)
}

/// Dimensions of mip `level`; a depth of 0 means no depth dimension
pub fn level_dimensions(width: u32, height: u32, depth: u32, level: u32) -> (u32, u32, u32) {
    let shrink = |v: u32| v.checked_shr(level).unwrap_or(0).max(1);
    let d = if depth == 0 { 0 } else { shrink(depth) };
    (shrink(width), shrink(height), d)
}

/// Reinterpret little-endian level bytes as elements of `data_type`
fn reinterpret(bytes: Vec<u8>, data_type: DataType) -> Result<PixelData, LoadError> {
    let size = data_type.size();
    if bytes.len() % size != 0 {
        return Err(LoadError::Decode(format!(
            "level size {} is not a multiple of the {}-byte element size",
            bytes.len(),
            size
        )));
    }

    let data = match data_type {
        DataType::UnsignedByte => PixelData::U8(bytes),
        DataType::HalfFloat => PixelData::U16(
            bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
        ),
        DataType::Float => PixelData::F32(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
    };
    Ok(data)
}

/// Bytes one image of a level occupies
pub fn level_byte_size(
    format: EngineFormat,
    data_type: DataType,
    width: u32,
    height: u32,
    depth: u32,
) -> u64 {
    let (w, h, d) = (width as u64, height as u64, depth.max(1) as u64);
    let channels = match format {
        EngineFormat::Rgba => 4,
        EngineFormat::Rg => 2,
        EngineFormat::Red => 1,
        // ASTC 6x6: 16-byte blocks
        _ => return w.div_ceil(6) * h.div_ceil(6) * d * 16,
    };
    w * h * d * channels * data_type.size() as u64
}

/// Decode one level; `max_len` bounds the declared uncompressed size
fn decode_level(
    level: &Ktx2Level,
    scheme: u32,
    decoder: Option<&dyn SupercompressionDecoder>,
    max_len: u64,
) -> Result<Vec<u8>, LoadError> {
    match scheme {
        KHR_SUPERCOMPRESSION_NONE => Ok(level.level_data.clone()),
        KHR_SUPERCOMPRESSION_ZSTD => {
            let declared = level.uncompressed_byte_length;
            if declared > max_len {
                return Err(LoadError::Decode(format!(
                    "level declares {} uncompressed bytes, at most {} expected",
                    declared, max_len
                )));
            }
            let expected_len = usize::try_from(declared).map_err(|_| {
                LoadError::Decode(format!("level size {} does not fit in memory", declared))
            })?;

            let decoder = decoder.ok_or_else(|| {
                LoadError::Decode("no Zstandard decoder available".to_string())
            })?;
            decoder
                .decode(&level.level_data, expected_len)
                .map_err(LoadError::decode)
        }
        other => Err(LoadError::UnsupportedSupercompression(other)),
    }
}

/// Build a texture description from a raw-family container
///
/// `decoder` is only consulted for Zstandard-supercompressed files. Levels
/// are decoded on the rayon pool, so call this from a blocking context.
pub fn create_raw_texture(
    container: &Ktx2Container,
    decoder: Option<&dyn SupercompressionDecoder>,
) -> Result<TextureDescription, LoadError> {
    let (format, data_type) =
        raw_format(container.vk_format).ok_or(LoadError::UnsupportedVkFormat(container.vk_format))?;

    let scheme = container.supercompression_scheme;
    if scheme != KHR_SUPERCOMPRESSION_NONE && scheme != KHR_SUPERCOMPRESSION_ZSTD {
        return Err(LoadError::UnsupportedSupercompression(scheme));
    }
    // Layers and faces are not split out, but their bytes may share a level
    let images = container.layer_count.max(1) as u64 * container.face_count.max(1) as u64;

    let depth = container.pixel_depth;
    let kind = if !format.is_compressed() {
        if depth == 0 {
            TextureKind::Texture2D
        } else {
            TextureKind::Volume { depth }
        }
    } else if depth > 0 {
        return Err(LoadError::UnsupportedDepth);
    } else {
        TextureKind::Texture2D
    };

    debug!(
        "Decoding {} raw levels ({} {:?}, scheme {})",
        container.levels.len(),
        format.name(),
        data_type,
        scheme
    );

    let mipmaps = container
        .levels
        .par_iter()
        .enumerate()
        .map(|(i, level)| {
            let (width, height, depth) =
                level_dimensions(container.pixel_width, container.pixel_height, depth, i as u32);
            let max_len = level_byte_size(format, data_type, width, height, depth)
                .saturating_mul(images);
            let bytes = decode_level(level, scheme, decoder, max_len)?;
            Ok(MipLevel {
                data: reinterpret(bytes, data_type)?,
                width,
                height,
                depth,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    let descriptor = container.descriptor();
    let (color_space, diagnostic) = resolve_color_space(&descriptor);

    Ok(TextureDescription {
        kind,
        format,
        data_type,
        width: container.pixel_width,
        height: container.pixel_height,
        min_filter: Filter::for_mip_count(mipmaps.len()),
        mag_filter: Filter::Linear,
        faces: vec![TextureFace { mipmaps }],
        generate_mipmaps: false,
        premultiply_alpha: descriptor.flags & KHR_DF_FLAG_ALPHA_PREMULTIPLIED != 0,
        color_space,
        diagnostics: diagnostic.into_iter().collect(),
    })
}

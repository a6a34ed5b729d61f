//! Basis Universal transcoding
//!
//! Runs inside an execution unit: opens the file with the unit's codec,
//! negotiates the target against the unit's capability profile and
//! transcodes every face, mip and layer.

pub mod codec;
pub mod negotiate;

use anyhow::{bail, Result};
use tracing::{debug, warn};

use crate::config::CapabilityProfile;
use crate::formats::{BasisFormat, EngineFormat};
use crate::texture::{Diagnostic, MipLevel, PixelData, TextureFace};

pub use codec::{ImageLevelInfo, Transcoder, TranscoderFile, TranscoderModule};
pub use negotiate::{select_format, FormatSelection};

/// Output of one transcode task
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeResult {
    pub faces: Vec<TextureFace>,
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
    pub format: EngineFormat,
    /// Raw DFD flags word
    pub dfd_flags: u32,
    pub diagnostics: Vec<Diagnostic>,
}

/// Transcode a whole KTX2 file
///
/// Layers are concatenated inside each mip level. Single-level textures keep
/// the block-padded dimensions so non-multiple-of-four sizes still upload.
pub fn transcode_file(
    transcoder: &mut dyn Transcoder,
    data: &[u8],
    caps: &CapabilityProfile,
) -> Result<TranscodeResult> {
    let mut file = transcoder.open(data);

    if !file.is_valid() {
        bail!("Invalid or unsupported .ktx2 file");
    }

    let basis = if file.is_uastc() {
        BasisFormat::Uastc4x4
    } else {
        BasisFormat::Etc1s
    };
    let width = file.width();
    let height = file.height();
    let layer_count = file.layers().max(1);
    let level_count = file.levels();
    let face_count = file.faces();
    let has_alpha = file.has_alpha();
    let dfd_flags = file.dfd_flags();

    if width == 0 || height == 0 || level_count == 0 {
        bail!("Invalid texture");
    }

    let selection = select_format(basis, caps, width, height, has_alpha);
    let mut diagnostics = Vec::new();
    if selection.fallback {
        diagnostics.push(Diagnostic::UncompressedFallback);
    }

    debug!(
        "Transcoding {} {}x{} ({} levels, {} layers, {} faces) to {}",
        basis.name(),
        width,
        height,
        level_count,
        layer_count,
        face_count,
        selection.transcoder_format.name()
    );

    if !file.start_transcoding() {
        bail!(".startTranscoding failed");
    }

    let mut faces = Vec::with_capacity(face_count as usize);

    for face in 0..face_count {
        let mut mipmaps = Vec::with_capacity(level_count as usize);

        for mip in 0..level_count {
            let mut mip_data = Vec::new();
            let mut mip_width = 0;
            let mut mip_height = 0;

            for layer in 0..layer_count {
                let info = file.image_level_info(mip, layer, face);

                if face == 0
                    && mip == 0
                    && layer == 0
                    && (info.orig_width % 4 != 0 || info.orig_height % 4 != 0)
                {
                    warn!("ETC1S and UASTC textures should use multiple-of-four dimensions.");
                    diagnostics.push(Diagnostic::NonMultipleOfFour {
                        width: info.orig_width,
                        height: info.orig_height,
                    });
                }

                if level_count > 1 {
                    mip_width = info.orig_width;
                    mip_height = info.orig_height;
                } else {
                    mip_width = info.width;
                    mip_height = info.height;
                }

                let size = file.transcoded_size(mip, layer, selection.transcoder_format);
                let offset = mip_data.len();
                mip_data.resize(offset + size, 0);

                if !file.transcode_image(
                    &mut mip_data[offset..],
                    mip,
                    layer,
                    face,
                    selection.transcoder_format,
                ) {
                    bail!(".transcodeImage failed.");
                }
            }

            mipmaps.push(MipLevel {
                data: PixelData::U8(mip_data),
                width: mip_width,
                height: mip_height,
                depth: 0,
            });
        }

        faces.push(TextureFace { mipmaps });
    }

    Ok(TranscodeResult {
        faces,
        width,
        height,
        has_alpha,
        format: selection.engine_format,
        dfd_flags,
        diagnostics,
    })
}

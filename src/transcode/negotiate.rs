//! Transcode target negotiation
//!
//! The best target depends on the Basis encoding (ETC1S or UASTC), the
//! device's compressed-format support and the texture dimensions. Formats are
//! ranked separately for ETC1S and UASTC.
//!
//! RGBA32 is only chosen as a last resort. For UASTC it can look better than
//! ETC1/2, BC1/3 or PVRTC at a large memory cost, but that choice is not
//! exposed: when nothing compressed matches, correctness wins over memory.

use once_cell::sync::Lazy;
use tracing::warn;

use crate::config::CapabilityProfile;
use crate::formats::{BasisFormat, EngineFormat, TranscoderFormat};

/// Capability flag a [`FormatOption`] depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Astc,
    Bptc,
    Dxt,
    Etc1,
    Etc2,
    Pvrtc,
}

impl Capability {
    pub fn is_supported(self, caps: &CapabilityProfile) -> bool {
        match self {
            Capability::Astc => caps.astc,
            Capability::Bptc => caps.bptc,
            Capability::Dxt => caps.dxt,
            Capability::Etc1 => caps.etc1,
            Capability::Etc2 => caps.etc2,
            Capability::Pvrtc => caps.pvrtc,
        }
    }
}

/// One GPU-native target family
///
/// `transcoder_formats` and `engine_formats` hold the opaque variant first and
/// the alpha variant second; single-entry rows cannot carry alpha.
#[derive(Debug)]
pub struct FormatOption {
    pub capability: Capability,
    pub basis_formats: &'static [BasisFormat],
    pub transcoder_formats: &'static [TranscoderFormat],
    pub engine_formats: &'static [EngineFormat],
    /// Lower is preferred; `None` means never used for ETC1S
    pub priority_etc1s: Option<u32>,
    /// Lower is preferred; `None` means never used for UASTC
    pub priority_uastc: Option<u32>,
    pub needs_power_of_two: bool,
}

impl FormatOption {
    pub fn priority(&self, basis: BasisFormat) -> Option<u32> {
        match basis {
            BasisFormat::Etc1s => self.priority_etc1s,
            BasisFormat::Uastc4x4 => self.priority_uastc,
        }
    }

    pub fn supports_alpha(&self) -> bool {
        self.transcoder_formats.len() >= 2
    }
}

pub static FORMAT_OPTIONS: [FormatOption; 6] = [
    FormatOption {
        capability: Capability::Astc,
        basis_formats: &[BasisFormat::Uastc4x4],
        transcoder_formats: &[TranscoderFormat::Astc4x4, TranscoderFormat::Astc4x4],
        engine_formats: &[EngineFormat::RgbaAstc4x4, EngineFormat::RgbaAstc4x4],
        priority_etc1s: None,
        priority_uastc: Some(1),
        needs_power_of_two: false,
    },
    FormatOption {
        capability: Capability::Bptc,
        basis_formats: &[BasisFormat::Etc1s, BasisFormat::Uastc4x4],
        transcoder_formats: &[TranscoderFormat::Bc7M5, TranscoderFormat::Bc7M5],
        engine_formats: &[EngineFormat::RgbaBptc, EngineFormat::RgbaBptc],
        priority_etc1s: Some(3),
        priority_uastc: Some(2),
        needs_power_of_two: false,
    },
    FormatOption {
        capability: Capability::Dxt,
        basis_formats: &[BasisFormat::Etc1s, BasisFormat::Uastc4x4],
        transcoder_formats: &[TranscoderFormat::Bc1, TranscoderFormat::Bc3],
        engine_formats: &[EngineFormat::RgbS3tcDxt1, EngineFormat::RgbaS3tcDxt5],
        priority_etc1s: Some(4),
        priority_uastc: Some(5),
        needs_power_of_two: false,
    },
    FormatOption {
        capability: Capability::Etc2,
        basis_formats: &[BasisFormat::Etc1s, BasisFormat::Uastc4x4],
        transcoder_formats: &[TranscoderFormat::Etc1, TranscoderFormat::Etc2],
        engine_formats: &[EngineFormat::RgbEtc2, EngineFormat::RgbaEtc2Eac],
        priority_etc1s: Some(1),
        priority_uastc: Some(3),
        needs_power_of_two: false,
    },
    FormatOption {
        capability: Capability::Etc1,
        basis_formats: &[BasisFormat::Etc1s, BasisFormat::Uastc4x4],
        transcoder_formats: &[TranscoderFormat::Etc1],
        engine_formats: &[EngineFormat::RgbEtc1],
        priority_etc1s: Some(2),
        priority_uastc: Some(4),
        needs_power_of_two: false,
    },
    FormatOption {
        capability: Capability::Pvrtc,
        basis_formats: &[BasisFormat::Etc1s, BasisFormat::Uastc4x4],
        transcoder_formats: &[TranscoderFormat::Pvrtc14Rgb, TranscoderFormat::Pvrtc14Rgba],
        engine_formats: &[EngineFormat::RgbPvrtc4bppv1, EngineFormat::RgbaPvrtc4bppv1],
        priority_etc1s: Some(5),
        priority_uastc: Some(6),
        needs_power_of_two: true,
    },
];

static ETC1S_OPTIONS: Lazy<Vec<&'static FormatOption>> =
    Lazy::new(|| ranked_options(BasisFormat::Etc1s));
static UASTC_OPTIONS: Lazy<Vec<&'static FormatOption>> =
    Lazy::new(|| ranked_options(BasisFormat::Uastc4x4));

/// Stable sort of the table by the family's priority, unranked rows dropped
fn ranked_options(basis: BasisFormat) -> Vec<&'static FormatOption> {
    let mut options: Vec<&'static FormatOption> = FORMAT_OPTIONS
        .iter()
        .filter(|opt| opt.priority(basis).is_some())
        .collect();
    options.sort_by_key(|opt| opt.priority(basis));
    options
}

/// Preference order for a Basis encoding
pub fn options_for(basis: BasisFormat) -> &'static [&'static FormatOption] {
    match basis {
        BasisFormat::Etc1s => &ETC1S_OPTIONS,
        BasisFormat::Uastc4x4 => &UASTC_OPTIONS,
    }
}

/// Result of [`select_format`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSelection {
    pub transcoder_format: TranscoderFormat,
    pub engine_format: EngineFormat,
    /// True when nothing compressed matched and RGBA32 was chosen
    pub fallback: bool,
}

/// Pick the transcode target for a texture
pub fn select_format(
    basis: BasisFormat,
    caps: &CapabilityProfile,
    width: u32,
    height: u32,
    has_alpha: bool,
) -> FormatSelection {
    for opt in options_for(basis) {
        if !opt.capability.is_supported(caps) {
            continue;
        }
        if !opt.basis_formats.contains(&basis) {
            continue;
        }
        if has_alpha && !opt.supports_alpha() {
            continue;
        }
        if opt.needs_power_of_two && !(is_power_of_two(width) && is_power_of_two(height)) {
            continue;
        }

        let variant = usize::from(has_alpha);
        return FormatSelection {
            transcoder_format: opt.transcoder_formats[variant],
            engine_format: opt.engine_formats[variant],
            fallback: false,
        };
    }

    warn!("No suitable compressed texture format found. Decoding to RGBA32.");

    FormatSelection {
        transcoder_format: TranscoderFormat::Rgba32,
        engine_format: EngineFormat::Rgba,
        fallback: true,
    }
}

/// Power-of-two test where 0, 1 and 2 always pass
pub fn is_power_of_two(value: u32) -> bool {
    value <= 2 || value.is_power_of_two()
}

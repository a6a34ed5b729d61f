//! Color space resolution from the data format descriptor

use tracing::warn;

use crate::container::{
    DataFormatDescriptor, KHR_DF_PRIMARIES_BT709, KHR_DF_PRIMARIES_DISPLAYP3,
    KHR_DF_PRIMARIES_UNSPECIFIED, KHR_DF_TRANSFER_SRGB,
};
use crate::texture::Diagnostic;

/// Color space tag attached to a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Data is not color (or primaries are unknown)
    NoColorSpace,
    Srgb,
    LinearSrgb,
    DisplayP3,
    LinearDisplayP3,
}

impl ColorSpace {
    /// True when samples are encoded with the sRGB transfer function
    pub fn is_srgb_transfer(&self) -> bool {
        matches!(self, ColorSpace::Srgb | ColorSpace::DisplayP3)
    }
}

/// Resolve the color space of a descriptor block
///
/// Unrecognized primaries resolve to [`ColorSpace::NoColorSpace`] and
/// produce a diagnostic naming the value.
pub fn resolve_color_space(dfd: &DataFormatDescriptor) -> (ColorSpace, Option<Diagnostic>) {
    let srgb = dfd.transfer_function == KHR_DF_TRANSFER_SRGB;

    match dfd.color_primaries {
        KHR_DF_PRIMARIES_BT709 => {
            let space = if srgb { ColorSpace::Srgb } else { ColorSpace::LinearSrgb };
            (space, None)
        }
        KHR_DF_PRIMARIES_DISPLAYP3 => {
            let space = if srgb {
                ColorSpace::DisplayP3
            } else {
                ColorSpace::LinearDisplayP3
            };
            (space, None)
        }
        KHR_DF_PRIMARIES_UNSPECIFIED => (ColorSpace::NoColorSpace, None),
        other => {
            warn!("Unsupported color primaries, \"{}\"", other);
            (
                ColorSpace::NoColorSpace,
                Some(Diagnostic::UnsupportedColorPrimaries(other)),
            )
        }
    }
}

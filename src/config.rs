//! Loader configuration
//!
//! The capability profile says which GPU-native compressed formats the
//! device can sample. It is set once by the caller and copied into every
//! execution unit when the unit is bootstrapped.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Compressed texture families supported by the current device/driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityProfile {
    /// ASTC LDR blocks
    pub astc: bool,
    /// BPTC / BC7
    pub bptc: bool,
    /// S3TC / DXT (BC1-BC3)
    pub dxt: bool,
    /// ETC1 RGB
    pub etc1: bool,
    /// ETC2 / EAC
    pub etc2: bool,
    /// PVRTC version 1
    pub pvrtc: bool,
}

impl CapabilityProfile {
    /// A device that supports no compressed formats (every texture falls back to RGBA32)
    pub fn none() -> Self {
        Self::default()
    }

    /// A device that supports every compressed family
    pub fn all() -> Self {
        Self {
            astc: true,
            bptc: true,
            dxt: true,
            etc1: true,
            etc2: true,
            pvrtc: true,
        }
    }

    /// Parse a profile from JSON, e.g. `{"dxt": true, "bptc": true}`
    ///
    /// Missing keys default to `false`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a profile from WebGPU-style feature names
    ///
    /// Accepts `texture-compression-{astc,bc,bptc,etc1,etc2,pvrtc}`.
    /// `texture-compression-bc` enables both S3TC and BPTC, matching how
    /// WebGPU exposes the BC family as a single feature.
    pub fn from_feature_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let mut profile = Self::none();
        for name in names {
            match name.as_ref() {
                "texture-compression-astc" => profile.astc = true,
                "texture-compression-bc" => {
                    profile.dxt = true;
                    profile.bptc = true;
                }
                "texture-compression-bptc" => profile.bptc = true,
                "texture-compression-etc1" => profile.etc1 = true,
                "texture-compression-etc2" => profile.etc2 = true,
                "texture-compression-pvrtc" => profile.pvrtc = true,
                other => return Err(ConfigError::UnknownFeature(other.to_string())),
            }
        }
        Ok(profile)
    }

    /// Build a profile from the features of a wgpu adapter or device
    ///
    /// wgpu has no ETC1 or PVRTC textures, so those flags stay off.
    pub fn from_wgpu_features(features: wgpu::Features) -> Self {
        let bc = features.contains(wgpu::Features::TEXTURE_COMPRESSION_BC);
        Self {
            astc: features.contains(wgpu::Features::TEXTURE_COMPRESSION_ASTC),
            bptc: bc,
            dxt: bc,
            etc1: false,
            etc2: features.contains(wgpu::Features::TEXTURE_COMPRESSION_ETC2),
            pvrtc: false,
        }
    }

    /// True when no compressed family is available
    pub fn is_empty(&self) -> bool {
        *self == Self::none()
    }
}

/// Configuration for a [`crate::Ktx2Loader`]
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Maximum number of execution units (defaults to the host's available parallelism)
    pub worker_limit: Option<usize>,
}

impl LoaderConfig {
    /// Resolved worker limit
    pub fn effective_worker_limit(&self) -> usize {
        self.worker_limit.unwrap_or_else(default_worker_limit)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_limit == Some(0) {
            return Err(ConfigError::ZeroWorkerLimit);
        }
        Ok(())
    }
}

/// Default number of execution units: one per available hardware thread
pub fn default_worker_limit() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

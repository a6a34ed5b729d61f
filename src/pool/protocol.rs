//! Messages exchanged with execution units

use std::fmt;
use std::sync::Arc;

use crate::config::CapabilityProfile;
use crate::error::LoadError;
use crate::source::SourceBuffer;
use crate::transcode::{TranscodeResult, TranscoderModule};

/// Pool → unit
pub(crate) enum UnitMessage {
    /// Always the first message a unit receives
    Init {
        capabilities: CapabilityProfile,
        module: Arc<dyn TranscoderModule>,
    },
    /// The buffer handle moves into the unit and is dropped there
    Transcode {
        request_id: u64,
        buffer: SourceBuffer,
    },
}

impl fmt::Debug for UnitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitMessage::Init { capabilities, .. } => f
                .debug_struct("Init")
                .field("capabilities", capabilities)
                .finish_non_exhaustive(),
            UnitMessage::Transcode { request_id, buffer } => f
                .debug_struct("Transcode")
                .field("request_id", request_id)
                .field("bytes", &buffer.len())
                .finish(),
        }
    }
}

/// Unit → pool
#[derive(Debug)]
pub(crate) enum UnitResponse {
    Transcoded {
        request_id: u64,
        result: TranscodeResult,
    },
    Error {
        request_id: u64,
        message: String,
    },
}

impl UnitResponse {
    pub(crate) fn request_id(&self) -> u64 {
        match self {
            UnitResponse::Transcoded { request_id, .. } | UnitResponse::Error { request_id, .. } => {
                *request_id
            }
        }
    }

    pub(crate) fn into_result(self) -> Result<TranscodeResult, LoadError> {
        match self {
            UnitResponse::Transcoded { result, .. } => Ok(result),
            UnitResponse::Error { message, .. } => Err(LoadError::Transcode(message)),
        }
    }
}

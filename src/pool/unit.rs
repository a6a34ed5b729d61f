//! Execution unit
//!
//! One OS thread, one codec instance, one task at a time. Messages are
//! handled in the order they were sent.

use crossbeam_channel::Receiver;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::protocol::{UnitMessage, UnitResponse};
use crate::config::CapabilityProfile;
use crate::transcode::{self, Transcoder, TranscoderModule};

struct Runtime {
    capabilities: CapabilityProfile,
    module: Arc<dyn TranscoderModule>,
    transcoder: Option<Box<dyn Transcoder>>,
}

impl Runtime {
    /// Codec instance, created on first use and after a codec panic
    fn transcoder(&mut self, index: usize) -> Result<&mut Box<dyn Transcoder>, String> {
        if self.transcoder.is_none() {
            let transcoder = self
                .module
                .instantiate()
                .map_err(|e| format!("Transcoder bootstrap failed: {:#}", e))?;
            info!("Execution unit {} initialized transcoder", index);
            self.transcoder = Some(transcoder);
        }
        self.transcoder
            .as_mut()
            .ok_or_else(|| "transcoder unavailable".to_string())
    }
}

/// Unit main loop
///
/// `report` hands a response back to the pool and returns `false` once the
/// pool is gone, which ends the loop. The loop also ends when the pool drops
/// its sender.
pub(crate) fn run<F>(index: usize, inbox: Receiver<UnitMessage>, mut report: F)
where
    F: FnMut(UnitResponse) -> bool,
{
    let mut runtime: Option<Runtime> = None;

    for message in inbox.iter() {
        match message {
            UnitMessage::Init {
                capabilities,
                module,
            } => {
                let mut rt = Runtime {
                    capabilities,
                    module,
                    transcoder: None,
                };
                if let Err(e) = rt.transcoder(index) {
                    warn!("Execution unit {}: {}", index, e);
                }
                runtime = Some(rt);
            }
            UnitMessage::Transcode { request_id, buffer } => {
                debug!(
                    "Execution unit {} transcoding request {} ({} bytes)",
                    index,
                    request_id,
                    buffer.len()
                );

                let response = match runtime.as_mut() {
                    Some(rt) => handle_transcode(index, rt, request_id, buffer.as_slice()),
                    None => UnitResponse::Error {
                        request_id,
                        message: "execution unit received work before init".to_string(),
                    },
                };
                drop(buffer);

                if !report(response) {
                    break;
                }
            }
        }
    }

    debug!("Execution unit {} shut down", index);
}

fn handle_transcode(index: usize, rt: &mut Runtime, request_id: u64, data: &[u8]) -> UnitResponse {
    let capabilities = rt.capabilities;
    let transcoder = match rt.transcoder(index) {
        Ok(t) => t,
        Err(message) => return UnitResponse::Error { request_id, message },
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        transcode::transcode_file(transcoder.as_mut(), data, &capabilities)
    }));

    match outcome {
        Ok(Ok(result)) => UnitResponse::Transcoded { request_id, result },
        Ok(Err(e)) => {
            warn!("Execution unit {} request {} failed: {:#}", index, request_id, e);
            UnitResponse::Error {
                request_id,
                message: format!("{:#}", e),
            }
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(
                "Execution unit {} codec panicked on request {}: {}",
                index, request_id, reason
            );
            // The codec state is unknown after a panic; start over on the next task
            rt.transcoder = None;
            UnitResponse::Error {
                request_id,
                message: format!("transcoder panicked: {}", reason),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceBuffer;
    use crate::testing::{FakeModule, FakeTexture};

    fn init(module: &FakeModule) -> UnitMessage {
        UnitMessage::Init {
            capabilities: CapabilityProfile::all(),
            module: Arc::new(module.clone()),
        }
    }

    fn transcode(request_id: u64, texture: &FakeTexture) -> UnitMessage {
        UnitMessage::Transcode {
            request_id,
            buffer: texture.to_buffer(),
        }
    }

    fn run_messages(messages: Vec<UnitMessage>) -> Vec<UnitResponse> {
        let (tx, rx) = crossbeam_channel::unbounded();
        for message in messages {
            tx.send(message).unwrap();
        }
        drop(tx);

        let mut responses = Vec::new();
        run(0, rx, |response| {
            responses.push(response);
            true
        });
        responses
    }

    #[test]
    fn test_responses_follow_submission_order() {
        let module = FakeModule::default();
        let responses = run_messages(vec![
            init(&module),
            transcode(1, &FakeTexture::basis(8, 8)),
            transcode(2, &FakeTexture::basis(16, 16)),
            transcode(3, &FakeTexture::basis(4, 4)),
        ]);

        let ids: Vec<u64> = responses.iter().map(|r| r.request_id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(module.stats.instances(), 1);
    }

    #[test]
    fn test_failure_keeps_unit_usable() {
        let module = FakeModule::default();
        let invalid = FakeTexture {
            valid: false,
            ..FakeTexture::basis(8, 8)
        };
        let responses = run_messages(vec![
            init(&module),
            transcode(1, &invalid),
            transcode(2, &FakeTexture::basis(8, 8)),
        ]);

        assert!(matches!(responses[0], UnitResponse::Error { request_id: 1, .. }));
        assert!(matches!(responses[1], UnitResponse::Transcoded { request_id: 2, .. }));
        assert_eq!(module.stats.instances(), 1);
    }

    #[test]
    fn test_panic_is_reported_and_codec_recreated() {
        let module = FakeModule::default();
        let crashing = FakeTexture {
            panic: true,
            ..FakeTexture::basis(8, 8)
        };
        let responses = run_messages(vec![
            init(&module),
            transcode(1, &crashing),
            transcode(2, &FakeTexture::basis(8, 8)),
        ]);

        match &responses[0] {
            UnitResponse::Error { message, .. } => assert!(message.contains("codec crashed")),
            other => panic!("expected error, got {:?}", other),
        }
        assert!(matches!(responses[1], UnitResponse::Transcoded { .. }));
        assert_eq!(module.stats.instances(), 2);
    }

    #[test]
    fn test_bootstrap_failure_fails_every_task() {
        let module = FakeModule {
            fail_instantiate: true,
            ..FakeModule::default()
        };
        let responses = run_messages(vec![
            init(&module),
            transcode(1, &FakeTexture::basis(8, 8)),
            transcode(2, &FakeTexture::basis(8, 8)),
        ]);

        assert_eq!(responses.len(), 2);
        for response in responses {
            match response {
                UnitResponse::Error { message, .. } => {
                    assert!(message.contains("bootstrap failed"))
                }
                other => panic!("expected error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_work_before_init_is_rejected() {
        let responses = run_messages(vec![UnitMessage::Transcode {
            request_id: 9,
            buffer: SourceBuffer::new(Vec::new()),
        }]);
        assert!(matches!(responses[0], UnitResponse::Error { request_id: 9, .. }));
    }

    #[test]
    fn test_loop_stops_when_pool_is_gone() {
        let module = FakeModule::default();
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(init(&module)).unwrap();
        tx.send(transcode(1, &FakeTexture::basis(8, 8))).unwrap();
        tx.send(transcode(2, &FakeTexture::basis(8, 8))).unwrap();

        let mut seen = 0;
        run(0, rx, |_| {
            seen += 1;
            false
        });
        assert_eq!(seen, 1);
    }
}

//! Execution pool
//!
//! Bounded set of execution units (OS threads) that run Basis transcodes.
//! Units are created on demand up to the limit; work that finds every unit
//! busy waits in a FIFO queue. Each task carries a request id and the unit's
//! response is matched back to the waiting caller by that id.

mod bootstrap;
pub(crate) mod protocol;
mod unit;

use crossbeam_channel::Sender;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::CapabilityProfile;
use crate::error::LoadError;
use crate::source::SourceBuffer;
use crate::transcode::{TranscodeResult, TranscoderModule};

pub use bootstrap::TranscoderBootstrap;
use protocol::{UnitMessage, UnitResponse};

type Responder = oneshot::Sender<Result<TranscodeResult, LoadError>>;

struct UnitHandle {
    sender: Sender<UnitMessage>,
    busy: bool,
}

struct QueuedTask {
    request_id: u64,
    buffer: SourceBuffer,
}

struct PoolState {
    limit: usize,
    /// Indexed by unit id; `None` for units never created or retired
    units: Vec<Option<UnitHandle>>,
    queue: VecDeque<QueuedTask>,
    pending: HashMap<u64, Responder>,
    next_request_id: u64,
    disposed: bool,
}

impl PoolState {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            units: Vec::new(),
            queue: VecDeque::new(),
            pending: HashMap::new(),
            next_request_id: 0,
            disposed: false,
        }
    }

    fn unit_count(&self) -> usize {
        self.units.iter().flatten().count()
    }

    /// A unit could not be started
    ///
    /// The next task fails. With no unit alive nothing would ever drain the
    /// queue, so every queued task fails.
    fn reject_on_spawn_failure(&mut self, message: &str) {
        let rejected = if self.unit_count() == 0 {
            self.queue.len()
        } else {
            self.queue.len().min(1)
        };

        for task in self.queue.drain(..rejected) {
            if let Some(responder) = self.pending.remove(&task.request_id) {
                let _ = responder.send(Err(LoadError::Bootstrap(message.to_string())));
            }
        }
    }
}

struct PoolShared {
    state: Mutex<PoolState>,
    capabilities: CapabilityProfile,
    module: Arc<dyn TranscoderModule>,
}

/// Pool of transcoding execution units
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Create an empty pool; units start when work arrives
    pub fn new(
        limit: usize,
        capabilities: CapabilityProfile,
        module: Arc<dyn TranscoderModule>,
    ) -> Self {
        let limit = limit.max(1);
        info!("Creating transcoder pool (limit {} units)", limit);

        Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState::new(limit)),
                capabilities,
                module,
            }),
        }
    }

    pub fn limit(&self) -> usize {
        self.shared.lock().limit
    }

    /// Change the unit limit
    ///
    /// Shrinking never interrupts running work: busy units above the new
    /// limit finish their task and then retire.
    pub fn set_limit(&self, limit: usize) {
        let limit = limit.max(1);
        let mut state = self.shared.lock();
        state.limit = limit;

        for slot in state.units.iter_mut().skip(limit) {
            if slot.as_ref().is_some_and(|unit| !unit.busy) {
                *slot = None;
            }
        }

        debug!("Transcoder pool limit set to {}", limit);
        self.shared.dispatch(&mut state);
    }

    /// Submit a buffer for transcoding
    ///
    /// The task is queued immediately; the returned future resolves when the
    /// unit reports back. The buffer handle moves into the unit.
    pub fn post_task(
        &self,
        buffer: SourceBuffer,
    ) -> impl Future<Output = Result<TranscodeResult, LoadError>> + Send + 'static {
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.shared.lock();
            if state.disposed {
                let _ = tx.send(Err(LoadError::PoolDisposed));
            } else {
                let request_id = state.next_request_id;
                state.next_request_id += 1;
                state.pending.insert(request_id, tx);
                state.queue.push_back(QueuedTask { request_id, buffer });
                self.shared.dispatch(&mut state);
            }
        }

        async move { rx.await.unwrap_or(Err(LoadError::PoolDisposed)) }
    }

    /// Units currently alive
    pub fn unit_count(&self) -> usize {
        self.shared.lock().unit_count()
    }

    /// Tasks waiting for a free unit
    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    /// Shut the pool down
    ///
    /// Queued and in-flight tasks resolve to [`LoadError::PoolDisposed`];
    /// running units finish their current task and exit.
    pub fn dispose(&self) {
        let mut state = self.shared.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;

        let queued = state.queue.len();
        let in_flight = state.pending.len().saturating_sub(queued);
        state.queue.clear();
        state.pending.clear();
        state.units.clear();

        info!(
            "Transcoder pool disposed ({} queued, {} in flight dropped)",
            queued, in_flight
        );
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl PoolShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().expect("transcoder pool lock poisoned")
    }

    /// Hand queued tasks to idle units, creating units up to the limit
    fn dispatch(self: &Arc<Self>, state: &mut PoolState) {
        while !state.queue.is_empty() {
            let Some(index) = self.acquire_unit(state) else {
                break;
            };
            let Some(task) = state.queue.pop_front() else {
                break;
            };
            self.send_task(state, index, task);
        }
    }

    /// First unit below the limit that is idle or not yet created
    fn acquire_unit(self: &Arc<Self>, state: &mut PoolState) -> Option<usize> {
        for index in 0..state.limit {
            let busy = match state.units.get(index) {
                Some(Some(unit)) => Some(unit.busy),
                _ => None,
            };
            match busy {
                Some(true) => continue,
                Some(false) => return Some(index),
                None => match self.spawn_unit(index) {
                    Ok(handle) => {
                        if state.units.len() <= index {
                            state.units.resize_with(index + 1, || None);
                        }
                        state.units[index] = Some(handle);
                        return Some(index);
                    }
                    Err(e) => {
                        warn!("Failed to start execution unit {}: {}", index, e);
                        state.reject_on_spawn_failure(&e.to_string());
                        return None;
                    }
                },
            }
        }
        None
    }

    fn spawn_unit(self: &Arc<Self>, index: usize) -> std::io::Result<UnitHandle> {
        let (sender, inbox) = crossbeam_channel::unbounded();
        let _ = sender.send(UnitMessage::Init {
            capabilities: self.capabilities,
            module: self.module.clone(),
        });

        let pool: Weak<PoolShared> = Arc::downgrade(self);
        std::thread::Builder::new()
            .name(format!("ktx2-transcoder-{}", index))
            .spawn(move || {
                unit::run(index, inbox, |response| match pool.upgrade() {
                    Some(pool) => {
                        pool.complete(index, response);
                        true
                    }
                    None => false,
                })
            })?;

        debug!("Started execution unit {}", index);
        Ok(UnitHandle {
            sender,
            busy: false,
        })
    }

    fn send_task(&self, state: &mut PoolState, index: usize, task: QueuedTask) {
        let request_id = task.request_id;
        let message = UnitMessage::Transcode {
            request_id,
            buffer: task.buffer,
        };
        let sent = match state.units.get_mut(index) {
            Some(Some(unit)) => {
                unit.busy = true;
                unit.sender.send(message).is_ok()
            }
            _ => false,
        };

        if !sent {
            warn!("Execution unit {} is gone; failing request {}", index, request_id);
            if let Some(slot) = state.units.get_mut(index) {
                *slot = None;
            }
            if let Some(responder) = state.pending.remove(&request_id) {
                let _ = responder.send(Err(LoadError::Transcode(
                    "execution unit terminated".to_string(),
                )));
            }
        } else {
            debug!("Dispatched request {} to execution unit {}", request_id, index);
        }
    }

    /// Called from a unit thread when it finishes a task
    fn complete(self: &Arc<Self>, index: usize, response: UnitResponse) {
        let mut state = self.lock();
        let request_id = response.request_id();

        match state.pending.remove(&request_id) {
            Some(responder) => {
                let _ = responder.send(response.into_result());
            }
            None => debug!("Dropping response for request {} (no waiter)", request_id),
        }

        if state.disposed {
            return;
        }

        if index >= state.limit {
            debug!("Retiring execution unit {} above limit {}", index, state.limit);
            if let Some(slot) = state.units.get_mut(index) {
                *slot = None;
            }
        } else if let Some(Some(unit)) = state.units.get_mut(index) {
            unit.busy = false;
        }

        self.dispatch(&mut state);
    }
}

//! KTX2 loader
//!
//! Entry point of the crate. A load parses the container, then either runs
//! the raw pixel path on the blocking pool or sends the file to the execution
//! pool for transcoding, and finally assembles a [`TextureDescription`].
//! Loads are deduplicated per source buffer through the [`TaskCache`].

use futures::future::FutureExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::{Outcome, TaskCache};
use crate::color::resolve_color_space;
use crate::config::{CapabilityProfile, LoaderConfig};
use crate::error::ConfigError;
use crate::container::{
    ContainerParser, Ktx2Container, KHR_DF_FLAG_ALPHA_PREMULTIPLIED, KHR_SUPERCOMPRESSION_ZSTD,
};
use crate::error::LoadError;
use crate::formats::DataType;
use crate::pool::{TranscoderBootstrap, WorkerPool};
use crate::raw::{create_raw_texture, SupercompressionDecoder, ZstdDecoder};
use crate::source::SourceBuffer;
use crate::texture::{Diagnostic, Filter, TextureDescription, TextureKind};
use crate::transcode::TranscodeResult;

/// Per-loader state shared with in-flight loads
struct LoaderState {
    bootstrap: Arc<TranscoderBootstrap>,
    config: Mutex<LoaderConfig>,
    capabilities: Mutex<Option<CapabilityProfile>>,
    pool: OnceCell<WorkerPool>,
    decoder: OnceCell<Arc<dyn SupercompressionDecoder>>,
    /// Another loader was active when this one started its pool
    multiple_loaders: AtomicBool,
    disposed: AtomicBool,
    /// True once the pool has been shut down and the bootstrap slot returned.
    /// Held while `disposed` is set and while a freshly started pool checks it.
    released: Mutex<bool>,
}

impl LoaderState {
    fn capabilities(&self) -> Result<CapabilityProfile, LoadError> {
        self.capabilities
            .lock()
            .expect("capabilities lock poisoned")
            .ok_or(LoadError::NotConfigured)
    }

    /// Start the execution pool once; concurrent callers wait for the same start
    async fn pool(&self) -> Result<&WorkerPool, LoadError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(LoadError::PoolDisposed);
        }

        let pool = self
            .pool
            .get_or_try_init(|| async {
                if self.disposed.load(Ordering::SeqCst) {
                    return Err(LoadError::PoolDisposed);
                }
                let capabilities = self.capabilities()?;
                let limit = {
                    let config = self.config.lock().expect("loader config lock poisoned");
                    config.effective_worker_limit()
                };

                if self.bootstrap.acquire() > 0 {
                    warn!(
                        "Multiple active KTX2 loaders may cause performance issues. \
                         Use a single loader instance, or call dispose() on old instances."
                    );
                    self.multiple_loaders.store(true, Ordering::SeqCst);
                }

                info!("Initializing KTX2 loader ({} execution units max)", limit);
                Ok::<_, LoadError>(WorkerPool::new(limit, capabilities, self.bootstrap.module()))
            })
            .await?;

        // dispose() may have run while the pool was starting and found nothing to release
        let mut released = self.released.lock().expect("loader release lock poisoned");
        if self.disposed.load(Ordering::SeqCst) {
            self.release(&mut released);
            return Err(LoadError::PoolDisposed);
        }
        Ok(pool)
    }

    /// Mark the loader disposed and shut the pool down if it started.
    /// Returns false when it was already disposed.
    fn shutdown(&self) -> bool {
        let mut released = self.released.lock().expect("loader release lock poisoned");
        let first = !self.disposed.swap(true, Ordering::SeqCst);
        self.release(&mut released);
        first
    }

    fn release(&self, released: &mut bool) {
        if *released {
            return;
        }
        if let Some(pool) = self.pool.get() {
            pool.dispose();
            self.bootstrap.release();
            *released = true;
        }
    }
}

impl Drop for LoaderState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Everything a load needs, cloned into the spawned conversion task
#[derive(Clone)]
struct Pipeline {
    parser: Arc<dyn ContainerParser>,
    decoder: Option<Arc<dyn SupercompressionDecoder>>,
    state: Arc<LoaderState>,
}

impl Pipeline {
    async fn decoder(&self) -> Arc<dyn SupercompressionDecoder> {
        self.state
            .decoder
            .get_or_init(|| async {
                debug!("Initializing Zstandard decoder");
                match &self.decoder {
                    Some(decoder) => decoder.clone(),
                    None => Arc::new(ZstdDecoder) as Arc<dyn SupercompressionDecoder>,
                }
            })
            .await
            .clone()
    }

    async fn convert(self, buffer: SourceBuffer) -> Outcome {
        let container = self
            .parser
            .parse(buffer.as_slice())
            .map_err(LoadError::parse)?;

        if !container.is_transcodable() {
            return self.convert_raw(container).await;
        }

        let pool = self.state.pool().await?;
        let result = pool.post_task(buffer).await?;
        Ok(Arc::new(self.assemble(result, &container)))
    }

    async fn convert_raw(&self, container: Ktx2Container) -> Outcome {
        let decoder = if container.supercompression_scheme == KHR_SUPERCOMPRESSION_ZSTD {
            Some(self.decoder().await)
        } else {
            None
        };

        let texture = tokio::task::spawn_blocking(move || {
            create_raw_texture(&container, decoder.as_deref())
        })
        .await
        .map_err(|e| LoadError::Decode(format!("raw decode task failed: {}", e)))??;

        Ok(Arc::new(texture))
    }

    /// Build the texture description for a transcoded file
    fn assemble(&self, result: TranscodeResult, container: &Ktx2Container) -> TextureDescription {
        let kind = if container.is_cube() {
            TextureKind::Cube
        } else if container.layer_count > 1 {
            TextureKind::Array {
                layers: container.layer_count,
            }
        } else {
            TextureKind::Texture2D
        };

        let mip_count = result.faces.first().map_or(0, |face| face.mipmaps.len());
        let (color_space, color_diagnostic) = resolve_color_space(&container.descriptor());

        let mut diagnostics = result.diagnostics;
        diagnostics.extend(color_diagnostic);
        if self.state.multiple_loaders.load(Ordering::SeqCst) {
            diagnostics.push(Diagnostic::MultipleActiveLoaders);
        }

        TextureDescription {
            kind,
            format: result.format,
            data_type: DataType::UnsignedByte,
            width: result.width,
            height: result.height,
            faces: result.faces,
            min_filter: Filter::for_mip_count(mip_count),
            mag_filter: Filter::Linear,
            generate_mipmaps: false,
            premultiply_alpha: result.dfd_flags & KHR_DF_FLAG_ALPHA_PREMULTIPLIED != 0,
            color_space,
            diagnostics,
        }
    }
}

/// Loads KTX2 textures into GPU-ready descriptions
pub struct Ktx2Loader {
    pipeline: Pipeline,
    cache: Arc<TaskCache>,
}

impl Ktx2Loader {
    pub fn new<P: ContainerParser>(bootstrap: Arc<TranscoderBootstrap>, parser: P) -> Self {
        Self {
            pipeline: Pipeline {
                parser: Arc::new(parser),
                decoder: None,
                state: Arc::new(LoaderState {
                    bootstrap,
                    config: Mutex::new(LoaderConfig::default()),
                    capabilities: Mutex::new(None),
                    pool: OnceCell::new(),
                    decoder: OnceCell::new(),
                    multiple_loaders: AtomicBool::new(false),
                    disposed: AtomicBool::new(false),
                    released: Mutex::new(false),
                }),
            },
            cache: Arc::new(TaskCache::new()),
        }
    }

    pub fn with_config(self, config: LoaderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        *self.pipeline.state.config.lock().expect("loader config lock poisoned") = config;
        Ok(self)
    }

    pub fn with_worker_limit(self, limit: usize) -> Result<Self, ConfigError> {
        self.with_config(LoaderConfig {
            worker_limit: Some(limit),
        })
    }

    /// Replace the Zstandard decoder used by the raw pixel path
    pub fn with_decoder<D: SupercompressionDecoder>(mut self, decoder: D) -> Self {
        self.pipeline.decoder = Some(Arc::new(decoder));
        self
    }

    /// Share a task cache with other loaders
    pub fn with_task_cache(mut self, cache: Arc<TaskCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Set the device capability profile
    ///
    /// Execution units copy the profile when they start, so configure before
    /// the first load.
    pub fn configure(&self, profile: CapabilityProfile) {
        debug!("Configured capability profile: {:?}", profile);
        *self
            .pipeline
            .state
            .capabilities
            .lock()
            .expect("capabilities lock poisoned") = Some(profile);
    }

    /// Configure from the features of a wgpu device
    pub fn detect_support(&self, features: wgpu::Features) {
        self.configure(CapabilityProfile::from_wgpu_features(features));
    }

    pub fn capabilities(&self) -> Option<CapabilityProfile> {
        self.pipeline.state.capabilities().ok()
    }

    pub fn task_cache(&self) -> &Arc<TaskCache> {
        &self.cache
    }

    pub fn worker_limit(&self) -> usize {
        match self.pipeline.state.pool.get() {
            Some(pool) => pool.limit(),
            None => self
                .pipeline
                .state
                .config
                .lock()
                .expect("loader config lock poisoned")
                .effective_worker_limit(),
        }
    }

    /// Change the execution unit limit, before or after the pool started
    pub fn set_worker_limit(&self, limit: usize) -> Result<(), ConfigError> {
        let config = LoaderConfig {
            worker_limit: Some(limit),
        };
        config.validate()?;
        *self
            .pipeline
            .state
            .config
            .lock()
            .expect("loader config lock poisoned") = config;

        if let Some(pool) = self.pipeline.state.pool.get() {
            pool.set_limit(limit);
        }
        Ok(())
    }

    /// Start the execution pool
    ///
    /// Loads call this on demand; calling it early moves the codec start-up
    /// off the first load.
    pub async fn init(&self) -> Result<(), LoadError> {
        self.pipeline.state.pool().await.map(|_| ())
    }

    /// Load a KTX2 file from memory
    ///
    /// Loading the same buffer again, or while a load is in flight, returns
    /// the first load's result.
    pub async fn load(&self, buffer: SourceBuffer) -> Outcome {
        self.pipeline.state.capabilities()?;

        let outcome = self.cache.get_or_create(&buffer, || {
            let pipeline = self.pipeline.clone();
            let task_buffer = buffer.clone();
            let handle = tokio::spawn(pipeline.convert(task_buffer));
            async move {
                handle
                    .await
                    .unwrap_or_else(|e| Err(LoadError::Transcode(format!("load task failed: {}", e))))
            }
            .boxed()
        });

        outcome.await
    }

    /// Read a KTX2 file from disk and load it
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Outcome {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))?;
        self.load(SourceBuffer::new(bytes)).await
    }

    /// Shut down the execution pool
    ///
    /// Pending transcodes fail with [`LoadError::PoolDisposed`]. Raw textures
    /// can still be loaded. Calling this more than once has no effect.
    pub fn dispose(&self) {
        if self.pipeline.state.shutdown() {
            info!("Disposing KTX2 loader");
        }
    }
}

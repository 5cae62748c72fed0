//! The exposure → shadow → tone-map → save pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::Dispatch;

use crate::adjust::{apply_exposure, apply_shadow};
use crate::error::ToneMapError;
use crate::image::PixelBuffer;
use crate::io::{load_image, save_image};
use crate::pipeline::params::ProcessingParameters;
use crate::tonemap::{BuiltinOperators, ToneMapBackend, ToneMapping};

/// Runs the processing stages for one session.
///
/// Parameters sit behind a lock so setters take `&self`; every run copies
/// them once up front. Failures never escape: each public operation returns
/// `None` (or, for tone mapping, the untransformed buffer) and logs the cause
/// through the processor's [`Dispatch`].
pub struct HdrProcessor {
    output_dir: PathBuf,
    params: RwLock<ProcessingParameters>,
    backend: Arc<dyn ToneMapBackend>,
    dispatch: Dispatch,
}

impl fmt::Debug for HdrProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdrProcessor")
            .field("output_dir", &self.output_dir)
            .field("params", &*self.params.read())
            .finish_non_exhaustive()
    }
}

impl HdrProcessor {
    /// Processor writing into `output_dir`, with default parameters, the
    /// built-in operators, and the dispatcher current on this thread.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            params: RwLock::new(ProcessingParameters::default()),
            backend: Arc::new(BuiltinOperators),
            dispatch: tracing::dispatcher::get_default(Dispatch::clone),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ToneMapBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Route this processor's log events to `dispatch`.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_parameters(self, params: ProcessingParameters) -> Self {
        *self.params.write() = params;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Snapshot of the current parameters.
    pub fn parameters(&self) -> ProcessingParameters {
        *self.params.read()
    }

    pub fn set_exposure(&self, value: impl Into<f64>) {
        self.params.write().set_exposure(value);
    }

    pub fn set_shadow(&self, value: impl Into<f64>) {
        self.params.write().set_shadow(value);
    }

    pub fn set_tone_mapping(&self, mapping: ToneMapping) {
        self.params.write().tone_mapping = mapping;
    }

    /// Stored unchecked; an out-of-range level fails the next save.
    pub fn set_compression_level(&self, level: i32) {
        self.params.write().compression_level = level;
    }

    /// Load `path` and apply exposure then shadow.
    ///
    /// Returns `None` when the file cannot be decoded; no later stage runs.
    pub fn process(&self, path: &Path) -> Option<PixelBuffer<u8>> {
        let params = self.parameters();
        self.in_scope(|| self.adjust(path, &params))
    }

    /// Apply the current tone-mapping selection.
    ///
    /// `None` passes through, and [`ToneMapping::None`] returns the buffer
    /// untouched. When the operator fails the buffer comes back unchanged.
    pub fn apply_tone_mapping(&self, buffer: Option<PixelBuffer<u8>>) -> Option<PixelBuffer<u8>> {
        let mapping = self.parameters().tone_mapping;
        self.in_scope(|| buffer.map(|buffer| self.tone_map(buffer, mapping)))
    }

    /// Run every stage on `path` and save to `output_dir/filename`.
    ///
    /// Returns the written path, or `None` if any required stage failed. On
    /// success exactly one file was written; on failure none was.
    pub fn produce_and_save(&self, path: &Path, filename: &str) -> Option<PathBuf> {
        let params = self.parameters();
        self.run(path, filename, &params)
    }

    /// Full run against an already-taken snapshot.
    pub(crate) fn run(
        &self,
        path: &Path,
        filename: &str,
        params: &ProcessingParameters,
    ) -> Option<PathBuf> {
        self.in_scope(|| {
            let adjusted = self.adjust(path, params)?;
            let mapped = self.tone_map(adjusted, params.tone_mapping);

            let output = self.output_dir.join(filename);
            match save_image(&mapped, &output, params.compression_level) {
                Ok(()) => {
                    tracing::info!("Saved HDR image to {}", output.display());
                    Some(output)
                }
                Err(e) => {
                    tracing::error!("Failed to save {}: {e}", output.display());
                    None
                }
            }
        })
    }

    fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    fn adjust(&self, path: &Path, params: &ProcessingParameters) -> Option<PixelBuffer<u8>> {
        let loaded = match load_image(path) {
            Ok(buffer) => buffer,
            Err(e) => {
                tracing::error!("Could not load image: {e}");
                return None;
            }
        };
        let (w, h) = loaded.dimensions();
        tracing::debug!("Loaded {} ({w}x{h})", path.display());

        let exposed = apply_exposure(loaded, params.exposure());
        tracing::debug!("Applied exposure {}", params.exposure());

        let shadowed = apply_shadow(Some(exposed), params.shadow());
        tracing::debug!("Applied shadow {}", params.shadow());
        shadowed
    }

    fn tone_map(&self, buffer: PixelBuffer<u8>, mapping: ToneMapping) -> PixelBuffer<u8> {
        if mapping == ToneMapping::None {
            return buffer;
        }

        match self.try_tone_map(&buffer, mapping) {
            Ok(Some(mapped)) => {
                tracing::debug!("Applied {mapping} tone mapping");
                mapped
            }
            Ok(None) => {
                tracing::warn!("No operator available for {mapping}, skipping tone mapping");
                buffer
            }
            Err(e) => {
                tracing::error!("Error in tone mapping ({mapping}): {e}");
                buffer
            }
        }
    }

    fn try_tone_map(
        &self,
        buffer: &PixelBuffer<u8>,
        mapping: ToneMapping,
    ) -> Result<Option<PixelBuffer<u8>>, ToneMapError> {
        let Some(operator) = self.backend.operator(mapping) else {
            return Ok(None);
        };

        let input = buffer.to_f32();
        let output = operator.process(&input)?;
        if output.dimensions() != input.dimensions() || output.channels() != input.channels() {
            return Err(ToneMapError::Operator(format!(
                "{} returned a {}x{} {} buffer for a {}x{} {} input",
                operator.name(),
                output.width(),
                output.height(),
                output.channels(),
                input.width(),
                input.height(),
                input.channels(),
            )));
        }
        Ok(Some(output.to_u8()))
    }
}

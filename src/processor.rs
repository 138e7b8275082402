//! Cutout processor
//!
//! Drives one image through the full pipeline: decode, segmentation
//! stages, canonical resize and PNG encode. Output files are only written
//! once every stage has succeeded.

use crate::{
    config::CutoutConfig,
    error::{CutoutError, Result},
    segmentation::Segmenter,
    services::{ImageIOService, OutputFormatHandler, ProcessingStage, ProgressTracker},
    types::{CutoutResult, ProcessingMetadata, ProcessingTimings},
};
use image::DynamicImage;
use instant::Instant;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Runs the cutout pipeline with one validated configuration
#[derive(Debug)]
pub struct CutoutProcessor {
    config: CutoutConfig,
    segmenter: Segmenter,
    progress_tracker: Option<ProgressTracker>,
}

impl CutoutProcessor {
    /// Create a processor, validating `config` up front
    pub fn new(config: CutoutConfig) -> Result<Self> {
        config.validate()?;
        if config.debug {
            debug!(config = ?config, "Cutout processor created");
        }
        Ok(Self {
            segmenter: Segmenter::new(&config.segmentation),
            config,
            progress_tracker: None,
        })
    }

    /// Attach a progress tracker
    #[must_use]
    pub fn with_progress(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = Some(tracker);
        self
    }

    pub fn set_progress_tracker(&mut self, tracker: Option<ProgressTracker>) {
        self.progress_tracker = tracker;
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &CutoutConfig {
        &self.config
    }

    fn report_stage(&mut self, stage: ProcessingStage) {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.report_stage(stage);
        }
    }

    fn report_failure<T>(&self, result: Result<T>) -> Result<T> {
        if let (Err(e), Some(tracker)) = (&result, &self.progress_tracker) {
            tracker.report_error(&e.to_string());
        }
        result
    }

    /// Process an already decoded image.
    ///
    /// Any alpha channel in `image` is ignored and replaced by the computed one.
    pub fn process_image(&mut self, image: &DynamicImage) -> Result<CutoutResult> {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.restart();
        }
        let total_start = Instant::now();
        let result = self.run_pipeline(image, ProcessingTimings::new(), total_start);
        self.report_failure(result)
    }

    /// Decode `bytes` and process the image
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Result<CutoutResult> {
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.restart();
        }
        let total_start = Instant::now();
        self.report_stage(ProcessingStage::ImageLoading);

        let result = ImageIOService::load_from_bytes(bytes).and_then(|image| {
            let timings = ProcessingTimings {
                image_decode_ms: total_start.elapsed().as_millis() as u64,
                ..ProcessingTimings::new()
            };
            self.run_pipeline(&image, timings, total_start)
        });
        self.report_failure(result)
    }

    /// Read an async stream to the end, then process it
    pub async fn process_reader<R: tokio::io::AsyncRead + Unpin>(
        &mut self,
        mut reader: R,
    ) -> Result<CutoutResult> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .await
            .map_err(|e| CutoutError::decode(format!("Failed to read from stream: {}", e)))?;
        self.process_bytes(&buffer)
    }

    /// Load and process an image file without writing anything
    #[instrument(skip_all, fields(input = %input_path.as_ref().display()))]
    pub fn process_file<P: AsRef<Path>>(
        &mut self,
        input_path: P,
    ) -> Result<CutoutResult> {
        let input_ref = input_path.as_ref();
        if let Some(ref mut tracker) = self.progress_tracker {
            tracker.restart();
        }
        let total_start = Instant::now();
        self.report_stage(ProcessingStage::ImageLoading);

        let result = ImageIOService::load_image(input_ref).and_then(|image| {
            let timings = ProcessingTimings {
                image_decode_ms: total_start.elapsed().as_millis() as u64,
                ..ProcessingTimings::new()
            };
            self.run_pipeline(&image, timings, total_start)
        });
        let result = self.report_failure(result)?;
        Ok(result.with_input_path(input_ref.display().to_string()))
    }

    /// Process `input_path` and write the cutout to `output_path`.
    ///
    /// Nothing is written unless the whole pipeline succeeds; the output file
    /// is replaced atomically.
    pub fn process_file_to<P, Q>(&mut self, input_path: P, output_path: Q) -> Result<CutoutResult>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let output_ref = output_path.as_ref();
        let result = self.process_file(input_path)?;

        self.report_stage(ProcessingStage::FileSaving);
        let saved = result.save_png(output_ref);
        self.report_failure(saved)?;

        info!(
            output = %output_ref.display(),
            bytes = result.png_data.len(),
            degenerate = result.is_degenerate(),
            "Cutout written"
        );
        if let Some(ref tracker) = self.progress_tracker {
            tracker.report_completion(result.timings().clone());
        }
        Ok(result)
    }

    #[instrument(
        skip_all,
        fields(
            width = image.width(),
            height = image.height(),
            canonical_size = self.config.output.canonical_size
        )
    )]
    fn run_pipeline(
        &mut self,
        image: &DynamicImage,
        mut timings: ProcessingTimings,
        total_start: Instant,
    ) -> Result<CutoutResult> {
        let original_dimensions = (image.width(), image.height());
        if original_dimensions.0 == 0 || original_dimensions.1 == 0 {
            return Err(CutoutError::decode(format!(
                "Input image has no pixels ({}x{})",
                original_dimensions.0, original_dimensions.1
            )));
        }

        let rgba = image.to_rgba8();

        let tracker = &mut self.progress_tracker;
        let outcome = self.segmenter.run_with_progress(&rgba, |stage| {
            if let Some(t) = tracker.as_mut() {
                t.report_stage(stage);
            }
        })?;
        timings.record_stages(&outcome.timings);

        self.report_stage(ProcessingStage::Resizing);
        let resize_start = Instant::now();
        let output = &self.config.output;
        let canvas =
            OutputFormatHandler::fit_to_canvas(&outcome.image, output.canonical_size, output.resize_filter)?;
        timings.resize_ms = resize_start.elapsed().as_millis() as u64;

        self.report_stage(ProcessingStage::Encoding);
        let encode_start = Instant::now();
        let png_data = OutputFormatHandler::encode_png(&canvas, &self.config.output)?;
        timings.encode_ms = encode_start.elapsed().as_millis() as u64;

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        self.report_stage(ProcessingStage::Completed);

        let mut metadata = ProcessingMetadata::new(self.config.output.canonical_size);
        metadata.segmentation = outcome.report;
        metadata.encoded_bytes = png_data.len();
        metadata.timings = timings;

        if metadata.segmentation.is_degenerate() {
            warn!("No subject found; producing a fully transparent cutout");
        }
        debug!("{}", metadata.timings.summary());

        Ok(CutoutResult::new(
            canvas,
            png_data,
            outcome.mask,
            original_dimensions,
            metadata,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ProgressReporter, ProgressUpdate};
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn dish_scene(width: u32, height: u32) -> DynamicImage {
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let r = width.min(height) as f32 / 3.0;
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            if d <= r {
                Rgba([235, 225, 205, 255])
            } else {
                Rgba([112, 112, 112, 255])
            }
        }))
    }

    #[derive(Default, Clone)]
    struct StageRecorder {
        stages: Arc<Mutex<Vec<ProcessingStage>>>,
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl ProgressReporter for StageRecorder {
        fn report_progress(&self, update: ProgressUpdate) {
            self.stages.lock().unwrap().push(update.stage);
        }

        fn report_completion(&self, _timings: ProcessingTimings) {}

        fn report_error(&self, _stage: ProcessingStage, error: &str) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = CutoutConfig::default();
        config.output.canonical_size = 0;
        assert!(matches!(
            CutoutProcessor::new(config),
            Err(CutoutError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_process_image_produces_canonical_output() {
        let mut processor = CutoutProcessor::new(
            CutoutConfig::builder().canonical_size(64).build().unwrap(),
        )
        .unwrap();
        let result = processor.process_image(&dish_scene(120, 80)).unwrap();

        assert_eq!(result.dimensions(), (64, 64));
        assert_eq!(result.original_dimensions, (120, 80));
        assert_eq!(result.mask.dimensions, (120, 80));
        assert!(!result.is_degenerate());
        assert_eq!(result.image.get_pixel(0, 0).0[3], 0);
        assert_eq!(result.image.get_pixel(32, 32).0[3], 255);
        assert_eq!(result.metadata.encoded_bytes, result.png_data.len());
    }

    #[test]
    fn test_process_bytes_rejects_garbage() {
        let mut processor = CutoutProcessor::new(CutoutConfig::default()).unwrap();
        let err = processor.process_bytes(b"definitely not a png").unwrap_err();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_process_file_to_writes_only_on_success() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.png");
        let mut processor = CutoutProcessor::new(
            CutoutConfig::builder().canonical_size(32).build().unwrap(),
        )
        .unwrap();

        let missing = dir.path().join("missing.png");
        assert!(processor.process_file_to(&missing, &output).is_err());
        assert!(!output.exists());

        let input = dir.path().join("dish.png");
        dish_scene(48, 48).save(&input).unwrap();
        let result = processor.process_file_to(&input, &output).unwrap();
        assert!(output.exists());
        assert_eq!(result.input_path.as_deref(), Some(input.display().to_string().as_str()));

        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (32, 32));
    }

    #[test]
    fn test_progress_stages_are_reported() {
        let recorder = StageRecorder::default();
        let mut processor = CutoutProcessor::new(
            CutoutConfig::builder().canonical_size(16).build().unwrap(),
        )
        .unwrap()
        .with_progress(ProgressTracker::new(Box::new(recorder.clone())));

        processor.process_image(&dish_scene(30, 30)).unwrap();
        let stages = recorder.stages.lock().unwrap().clone();
        assert_eq!(
            stages,
            vec![
                ProcessingStage::FloodFill,
                ProcessingStage::ShadowCleanup,
                ProcessingStage::ComponentSelection,
                ProcessingStage::Feathering,
                ProcessingStage::Resizing,
                ProcessingStage::Encoding,
                ProcessingStage::Completed,
            ]
        );

        assert!(processor.process_bytes(&[1, 2, 3]).is_err());
        assert_eq!(recorder.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_process_reader() {
        let mut bytes = Vec::new();
        dish_scene(40, 40)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let mut processor = CutoutProcessor::new(
            CutoutConfig::builder().canonical_size(20).build().unwrap(),
        )
        .unwrap();
        let result = processor.process_reader(std::io::Cursor::new(bytes)).await.unwrap();
        assert_eq!(result.dimensions(), (20, 20));
    }
}

//! Service layer
//!
//! Infrastructure concerns kept apart from the segmentation stages: file and
//! stream I/O, canvas fitting and encoding, progress reporting and batch
//! orchestration.

pub mod batch;
pub mod format;
pub mod io;
pub mod progress;

pub use batch::{
    dedupe_outputs, discover_inputs, mask_output_path, mirror_output_path, plan_jobs, BatchJob, BatchOptions,
    BatchProcessor, BatchReport, FailedFile, ProcessedFile,
};
pub use format::OutputFormatHandler;
pub use io::ImageIOService;
pub use progress::{
    BatchProcessingStats, ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};

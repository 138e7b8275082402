//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliResizeFilter};
use crate::config::{CutoutConfig, CutoutConfigBuilder, ResizeFilter};
use anyhow::{Context, Result};

/// Convert CLI arguments to a validated `CutoutConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Start from `--config` (or defaults) and apply every override flag
    pub(crate) fn from_cli(cli: &Cli) -> Result<CutoutConfig> {
        let base = match &cli.config {
            Some(path) => CutoutConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => CutoutConfig::default(),
        };

        let mut builder = CutoutConfigBuilder::from_config(base);
        if let Some(v) = cli.chroma_threshold {
            builder = builder.chroma_threshold(v);
        }
        if let Some(v) = cli.background_brightness {
            builder = builder.background_brightness_ceiling(v);
        }
        if let Some(v) = cli.shadow_brightness {
            builder = builder.shadow_brightness_ceiling(v);
        }
        if let Some(v) = cli.shadow_radius {
            builder = builder.shadow_sample_radius(v);
        }
        if let Some(v) = cli.shadow_step {
            builder = builder.shadow_sample_step(v);
        }
        if let Some(v) = cli.shadow_threshold {
            builder = builder.shadow_threshold(v);
        }
        if let Some(v) = cli.shadow_passes {
            builder = builder.shadow_passes(v);
        }
        if let Some(v) = cli.feather_radius {
            builder = builder.feather_radius(v);
        }
        if let Some(v) = cli.size {
            builder = builder.canonical_size(v);
        }
        if let Some(filter) = cli.filter {
            builder = builder.resize_filter(filter.into());
        }
        if cli.no_optimize {
            builder = builder.optimize_png(false);
        }
        if let Some(level) = cli.optimization_level {
            builder = builder.png_optimization_level(level);
        }
        if cli.verbose >= 2 {
            builder = builder.debug(true);
        }

        builder.build().context("Invalid configuration")
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        let uses_stdin = cli.input.iter().any(|s| s == "-");
        if uses_stdin && cli.input.len() > 1 {
            anyhow::bail!("Stdin (-) cannot be combined with other inputs");
        }

        if cli.output.as_deref() == Some("-") && !uses_stdin {
            let single_file = cli.input.len() == 1
                && cli
                    .input
                    .first()
                    .is_some_and(|p| std::path::Path::new(p).is_file());
            if !single_file {
                anyhow::bail!("Cannot use stdout (-) as output when processing multiple files");
            }
        }

        if let Some(level) = cli.optimization_level {
            if level > 6 {
                anyhow::bail!("Invalid optimization level {} (valid range: 0-6)", level);
            }
        }

        if let Some(pattern) = &cli.pattern {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid file pattern '{}'", pattern))?;
        }

        Ok(())
    }
}

impl From<CliResizeFilter> for ResizeFilter {
    fn from(filter: CliResizeFilter) -> Self {
        match filter {
            CliResizeFilter::Nearest => ResizeFilter::Nearest,
            CliResizeFilter::Triangle => ResizeFilter::Triangle,
            CliResizeFilter::Catmullrom => ResizeFilter::CatmullRom,
            CliResizeFilter::Gaussian => ResizeFilter::Gaussian,
            CliResizeFilter::Lanczos3 => ResizeFilter::Lanczos3,
        }
    }
}

//! ar-export - AR asset export tool
//!
//! Converts GLB models to USDZ packages for AR Quick Look. Without a USD
//! converter on PATH the GLB bytes are copied under the .usdz name.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use ar_export::{glb, manifest, model, ConversionMode, ConversionResult, Converter, Outcome};

#[derive(Parser)]
#[command(name = "ar-export")]
#[command(about = "AR asset export tool")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export all models listed in a manifest (or the built-in list)
    Build {
        /// Path to ar-export.toml manifest
        manifest: Option<PathBuf>,

        /// Source directory (overrides manifest)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the USD converter and copy every model
        #[arg(long)]
        copy_only: bool,

        /// Converter program to use (name on PATH or path)
        #[arg(long)]
        tool: Option<String>,
    },

    /// Validate manifest and report converter availability
    Check {
        /// Path to ar-export.toml manifest
        manifest: Option<PathBuf>,
    },

    /// Export a single GLB file
    Convert {
        /// Input GLB file
        input: PathBuf,

        /// Output .usdz file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the USD converter and copy the model
        #[arg(long)]
        copy_only: bool,

        /// Converter program to use (name on PATH or path)
        #[arg(long)]
        tool: Option<String>,
    },

    /// Print a summary of a GLB file
    Inspect {
        /// Input GLB file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Build {
            manifest,
            source,
            output,
            copy_only,
            tool,
        } => {
            let mut config = manifest::load_config(manifest.as_deref())?;
            if let Some(source) = source {
                config.source_dir = source;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }
            if copy_only {
                config.mode = ConversionMode::Copy;
            }
            if tool.is_some() {
                config.tool = tool;
            }
            manifest::validate(&config)?;

            tracing::info!(
                "Exporting {} model(s) from {:?} to {:?}",
                config.models.len(),
                config.source_dir,
                config.output_dir
            );
            let report = config
                .converter()
                .run(&config.models, &config.source_dir, &config.output_dir);

            for (name, outcome) in &report.entries {
                if let Outcome::Failed { reason } = outcome {
                    tracing::error!("{}: {}", name, reason);
                }
            }
            tracing::info!(
                "Build complete: {} converted, {} copied, {} missing, {} failed",
                report.converted(),
                report.copied(),
                report.missing(),
                report.failed()
            );
        }

        Commands::Check { manifest } => {
            let config = manifest::load_config(manifest.as_deref())?;
            tracing::info!("Manifest is valid ({} model(s))", config.models.len());

            for name in &config.models {
                let path = name.source_path(&config.source_dir);
                if !path.is_file() {
                    tracing::warn!("Model not found: {:?}", path);
                }
            }

            match config.mode {
                ConversionMode::Copy => tracing::info!("Copy mode: USD converter not used"),
                ConversionMode::Auto => match config.converter().toolkit() {
                    Some(toolkit) => tracing::info!("USD converter: {:?}", toolkit.program()),
                    None => tracing::warn!("No USD converter found; models will be copied"),
                },
            }
        }

        Commands::Convert {
            input,
            output,
            copy_only,
            tool,
        } => {
            if !input.is_file() {
                anyhow::bail!("Input not found: {:?}", input);
            }
            let output = output.unwrap_or_else(|| model::default_output_for(&input));
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }

            let mode = if copy_only {
                ConversionMode::Copy
            } else {
                ConversionMode::Auto
            };
            let converter = Converter::new(mode, tool);

            tracing::info!("Converting {:?} -> {:?}", input, output);
            let result = convert_or_copy(&converter, &input, &output);
            if !result.success {
                anyhow::bail!(
                    "{}",
                    result.message.unwrap_or_else(|| "Export failed".to_string())
                );
            }
            tracing::info!("Done!");
        }

        Commands::Inspect { input } => {
            let summary = glb::probe(&input)?;
            println!("{}: {}", input.display(), summary);
        }
    }

    Ok(())
}

/// Single-file variant of the batch loop
fn convert_or_copy(converter: &Converter, input: &Path, output: &Path) -> ConversionResult {
    let result = converter.convert(input, output);
    if result.success {
        return result;
    }
    converter.copy_as_fallback(input, output)
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

mod commands;

use crate::commands::{ViewportOverrides, run_compare, run_extract, run_health, run_render};
use layout_overlay::config::OverlaySettings;
use layout_overlay::logging::init_tracing;
use layout_overlay::studio::run_studio;

#[derive(Debug, Parser)]
#[command(
    name = "layout_overlay",
    about = "Render and compare design vs. code UI-tree overlays"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render both trees as overlay PNGs (`design.png`, `code.png`).
    Render {
        #[arg(long)]
        design: Option<PathBuf>,
        #[arg(long)]
        code: Option<PathBuf>,
        #[arg(long)]
        out_dir: PathBuf,
        #[command(flatten)]
        viewport: ViewportArgs,
    },
    /// Send both trees to the comparison service.
    Compare {
        #[arg(long)]
        design: PathBuf,
        #[arg(long)]
        code: PathBuf,
        /// Re-render both overlays with the unmatched sets into this directory.
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        viewport: ViewportArgs,
    },
    /// Print the components extracted from one tree.
    Extract {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Check that the comparison service is reachable.
    Health,
    /// Open the native two-pane viewer.
    Studio,
}

#[derive(Debug, Args)]
struct ViewportArgs {
    #[arg(long)]
    container_width: Option<f64>,
    #[arg(long)]
    viewport_height: Option<f64>,
    #[arg(long)]
    dpr: Option<f64>,
}

impl From<ViewportArgs> for ViewportOverrides {
    fn from(args: ViewportArgs) -> Self {
        Self {
            container_width: args.container_width,
            viewport_height: args.viewport_height,
            device_pixel_ratio: args.dpr,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_tracing()?;

    let cli = Cli::parse();
    let settings = OverlaySettings::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Render {
            design,
            code,
            out_dir,
            viewport,
        } => run_render(
            &settings,
            design.as_deref(),
            code.as_deref(),
            &out_dir,
            viewport.into(),
        )?,
        Commands::Compare {
            design,
            code,
            out_dir,
            json,
            viewport,
        } => {
            run_compare(
                &settings,
                &design,
                &code,
                out_dir.as_deref(),
                json,
                viewport.into(),
            )
            .await?
        }
        Commands::Extract { file, json } => run_extract(&file, json)?,
        Commands::Health => run_health(&settings).await?,
        Commands::Studio => run_studio(&settings)?,
    }

    Ok(())
}

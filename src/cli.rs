use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slidecast")]
#[command(author, version, about = "Render narrated slideshows from still images and voiceover")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render images and narration into a video
    Render {
        /// Image file (repeat for each slide, in order)
        #[arg(short, long = "image", required = true)]
        images: Vec<PathBuf>,

        /// Narration file (repeat to concatenate several parts)
        #[arg(short, long = "audio", required = true)]
        audio: Vec<PathBuf>,

        /// Effect options as a JSON object
        #[arg(long, conflicts_with = "effects_file")]
        effects: Option<String>,

        /// Read effect options from a JSON file
        #[arg(long)]
        effects_file: Option<PathBuf>,

        /// Apply a named preset (explicit effect options override it)
        #[arg(long)]
        preset: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available effects and presets
    Effects {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe one effect
    Describe {
        /// Effect category (transition, motion, color, overlay)
        category: String,
        /// Effect name
        name: String,
    },

    /// Show the effects a preset applies
    Preset {
        /// Preset name
        name: String,
    },

    /// List completed renders from the ledger
    Ledger {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate the duration of an audio file
    Probe {
        /// Audio file to measure
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

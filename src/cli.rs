// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cosimport")]
#[command(about = "Import boot images from object storage into Power Virtual Server workspaces")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new cosimport.yml configuration file
    Init {
        /// Workspace zone, e.g. dal12 (looked up at runtime when omitted)
        #[arg(long)]
        zone: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Register a managed image from a manifest
    Apply {
        /// Path to the image manifest
        #[arg(short = 'f', long = "file")]
        file: PathBuf,
    },

    /// Run a reconcile pass for a managed image
    Reconcile {
        /// Managed image name
        name: String,

        /// Keep reconciling until the image is ready or the import failed
        #[arg(short, long)]
        watch: bool,
    },

    /// Release the remote image and import job of a managed image
    Delete {
        /// Managed image name
        name: String,
    },

    /// Show stored status of managed images
    Status {
        /// Managed image name (all images when omitted)
        name: Option<String>,
    },
}

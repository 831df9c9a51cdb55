//! CLI module - Command-line interface for CropDoc
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// CropDoc - Crop disease analysis backend
#[derive(Parser)]
#[command(name = "cropdoc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Run the predictor on a local image and print the payload
    Predict {
        /// Path to the image
        path: std::path::PathBuf,
    },

    /// Create an account without going through the API
    CreateUser {
        username: String,
        password: String,
        #[arg(long)]
        email: Option<String>,
    },
}

pub use commands::*;

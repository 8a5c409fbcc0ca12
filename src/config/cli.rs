use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::toml_config::{FarmConfig, StorageBackend};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "barn-allocator")]
#[command(about = "Seats farm animals in barns of their favorite color")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Data file, overrides storage.path
    #[arg(long, global = true)]
    pub data: Option<String>,

    /// Keep the farm in memory for this run only
    #[arg(long, global = true)]
    pub in_memory: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize, Subcommand)]
pub enum Command {
    /// Admit one animal
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        color: String,
    },
    /// Admit every animal listed in a CSV file (header: name,favorite_color)
    Import {
        #[arg(long)]
        file: String,
    },
    /// Remove animals by id
    Remove {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// List every animal
    List,
    /// Show barn populations
    Barns,
    /// Remove every animal and barn
    Clear,
}

impl CliConfig {
    /// Applies command line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut FarmConfig) {
        if let Some(path) = &self.data {
            config.storage.backend = StorageBackend::Json;
            config.storage.path = path.clone();
        }
        if self.in_memory {
            config.storage.backend = StorageBackend::Memory;
        }
    }
}

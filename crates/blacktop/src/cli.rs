use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Blacktop Blackout console
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the host configuration file
    #[arg(long, default_value = "blacktop.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the console with the HTTP API server
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Manage backend plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
    /// Inspect client modules
    Modules {
        #[command(subcommand)]
        command: ModulesCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum PluginCommand {
    /// List installed and loaded plugins
    List,
    /// Install a plugin package from a source directory
    Install {
        /// Package source path
        source: String,
        /// Required package version
        #[arg(long)]
        version: Option<String>,
    },
    /// Load an installed plugin
    Load { id: String },
    /// Unload a loaded plugin
    Unload { id: String },
    /// Enable a loaded plugin
    Enable { id: String },
    /// Disable a loaded plugin
    Disable { id: String },
    /// Uninstall a plugin, unloading it first when needed
    Uninstall { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ModulesCommand {
    /// List modules in the store catalog
    List,
}

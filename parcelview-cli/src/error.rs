//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use parcelview::config::ConfigFileError;
use parcelview::fetch::FetchError;
use parcelview::layers::{LoaderError, SearchError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Configuration file could not be read or written
    Config(ConfigFileError),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Failed to create the HTTP client
    Client(FetchError),
    /// Feature request failed
    Fetch(FetchError),
    /// District base layers could not be loaded
    Load(LoaderError),
    /// Search input rejected
    Search(SearchError),
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Config(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value in the configuration file, or regenerate it with:");
                eprintln!("  parcelview config init --force");
            }
            CliError::Fetch(e) | CliError::Load(LoaderError::Fetch { source: e, .. })
                if matches!(e, FetchError::Network(_) | FetchError::Timeout) =>
            {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. No network connection");
                eprintln!("  2. Wrong [service] base_url in the configuration file");
                eprintln!("  3. The map server is down or overloaded");
            }
            CliError::Fetch(FetchError::Http { status: 404 })
            | CliError::Load(LoaderError::Fetch {
                source: FetchError::Http { status: 404 },
                ..
            }) => {
                eprintln!();
                eprintln!("Check the workspace and layer names in the [service] and [layers] sections.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Client(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Fetch(e) => write!(f, "{} ({})", e.user_message(), e),
            CliError::Load(e) => write!(f, "Failed to load district: {}", e),
            CliError::Search(e) => write!(f, "Search not possible: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Client(e) | CliError::Fetch(e) => Some(e),
            CliError::Load(e) => Some(e),
            CliError::Search(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::InvalidArgument(_) => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetch(e)
    }
}

impl From<LoaderError> for CliError {
    fn from(e: LoaderError) -> Self {
        CliError::Load(e)
    }
}

impl From<SearchError> for CliError {
    fn from(e: SearchError) -> Self {
        CliError::Search(e)
    }
}

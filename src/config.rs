// src/config.rs
use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_DATA_FILE_NAME, MAX_CACHE_CAPACITY};
use crate::error::AppError;
use crate::types::{ValidationError, WorkspaceId};
use clap::Parser;
use std::path::PathBuf;

/// Environment variable consulted when `--data-file` is not given.
pub const DATA_FILE_ENV: &str = "MYBLOCKS_DATA_FILE";

/// Where the block store lives when nothing is configured:
/// `$XDG_DATA_HOME/myblocks` (or `~/.local/share/myblocks`).
fn default_data_file() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".local").join("share"),
            Err(_) => std::env::temp_dir(),
        })
        .join("myblocks")
        .join(DEFAULT_DATA_FILE_NAME)
}

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about = "Browse and extend a block outline", long_about = None)]
pub struct CommandLineInput {
    /// JSON file holding the block tree
    #[arg(short = 'd', long, env = DATA_FILE_ENV)]
    pub data_file: Option<String>,

    /// Use (or create) the workspace with this id
    #[arg(short, long)]
    pub workspace_id: Option<String>,

    /// Number of query results kept in the cache
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: usize,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_file: PathBuf,
    pub workspace_id: Option<WorkspaceId>,
    pub cache_capacity: usize,
    pub verbose: bool,
}

impl AppConfig {
    /// Validates the command-line input (the env fallback is applied by clap).
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        let data_file = match cli.data_file {
            Some(path) if path.trim().is_empty() => {
                return Err(ValidationError::InvalidFilePath {
                    path,
                    reason: "path is empty".to_string(),
                }
                .into())
            }
            Some(path) => PathBuf::from(path),
            None => default_data_file(),
        };
        if data_file.is_dir() {
            return Err(ValidationError::InvalidFilePath {
                path: data_file.display().to_string(),
                reason: "is a directory".to_string(),
            }
            .into());
        }

        if cli.cache_capacity == 0 || cli.cache_capacity > MAX_CACHE_CAPACITY {
            return Err(ValidationError::OutOfBounds {
                value: cli.cache_capacity as u64,
                min: 1,
                max: MAX_CACHE_CAPACITY as u64,
            }
            .into());
        }

        let workspace_id = cli
            .workspace_id
            .as_deref()
            .map(WorkspaceId::parse)
            .transpose()?;

        Ok(AppConfig {
            data_file,
            workspace_id,
            cache_capacity: cli.cache_capacity,
            verbose: cli.verbose,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            workspace_id: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(args: &[&str]) -> CommandLineInput {
        let mut argv = vec!["myblocks"];
        argv.extend_from_slice(args);
        CommandLineInput::try_parse_from(argv).unwrap()
    }

    #[test]
    fn flags_resolve_into_a_config() {
        let config = AppConfig::resolve(input(&[
            "--data-file",
            "/tmp/notes.json",
            "--workspace-id",
            "0190A5C2-7B3E-7000-8000-000000000001",
            "--cache-capacity",
            "8",
            "-v",
        ]))
        .unwrap();

        assert_eq!(config.data_file, PathBuf::from("/tmp/notes.json"));
        assert_eq!(
            config.workspace_id.unwrap().as_str(),
            "0190A5C2-7B3E-7000-8000-000000000001"
        );
        assert_eq!(config.cache_capacity, 8);
        assert!(config.verbose);
    }

    #[test]
    fn cache_capacity_is_bounded() {
        for capacity in ["0", "65537"] {
            let err = AppConfig::resolve(input(&["-d", "x.json", "--cache-capacity", capacity]))
                .unwrap_err();
            assert!(matches!(
                err,
                AppError::ValidationError(ValidationError::OutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn malformed_workspace_ids_are_rejected() {
        let err = AppConfig::resolve(input(&["-d", "x.json", "-w", "not an id"])).unwrap_err();
        assert!(matches!(
            err,
            AppError::ValidationError(ValidationError::InvalidId(_))
        ));
    }

    #[test]
    fn a_directory_is_not_a_data_file() {
        let dir = std::env::temp_dir();
        let err =
            AppConfig::resolve(input(&["-d", dir.to_str().unwrap()])).unwrap_err();
        assert!(matches!(
            err,
            AppError::ValidationError(ValidationError::InvalidFilePath { .. })
        ));
    }

    #[test]
    fn defaults_point_at_a_json_file() {
        let config = AppConfig::default();
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert!(config.data_file.ends_with(DEFAULT_DATA_FILE_NAME));
    }
}

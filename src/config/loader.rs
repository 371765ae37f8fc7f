use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::StepmapConfig;
use crate::core::errors::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".stepmap.toml";
const MAX_TRAVERSAL_DEPTH: usize = 10;

pub(crate) fn read_config_file(path: &Path) -> std::result::Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parses and validates config from a TOML string
pub fn parse_and_validate_config(contents: &str) -> std::result::Result<StepmapConfig, String> {
    let config = toml::from_str::<StepmapConfig>(contents)
        .map_err(|e| format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))?;
    config.validate()?;
    Ok(config)
}

/// Loads a discovered config file; problems are logged and skipped
pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<StepmapConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("{} in {}. Ignoring it.", e, config_path.display());
            None
        }
    }
}

pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // "not found" is the common case while walking up
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Loads an explicitly requested config file. Unlike discovery, any problem
/// with it is an error.
pub fn load_config_from(path: &Path) -> Result<StepmapConfig> {
    let contents = read_config_file(path)
        .map_err(|e| Error::file_system("Failed to read config file", path, e))?;
    parse_and_validate_config(&contents)
        .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
}

/// Searches `start` and its ancestors for a config file
pub fn discover_config(start: PathBuf) -> StepmapConfig {
    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            StepmapConfig::default()
        })
}

pub fn load_config() -> StepmapConfig {
    match std::env::current_dir() {
        Ok(dir) => discover_config(dir),
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            StepmapConfig::default()
        }
    }
}

//! Path utilities for faceprint.

use std::io;
use std::path::PathBuf;

/// Default base directory name under the user's home.
pub const DEFAULT_BASE_DIR: &str = ".faceprint";

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default database filename inside the data directory.
pub const DEFAULT_DB_FILE: &str = "faces.redb";

/// Provides access to the faceprint directory structure.
#[derive(Debug, Clone)]
pub struct Paths {
    /// User's home directory.
    pub home_dir: PathBuf,
}

impl Paths {
    /// Resolves paths relative to the current user's home directory.
    pub fn new() -> io::Result<Self> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "could not find home directory")
        })?;
        Ok(Self { home_dir })
    }

    /// Resolves paths relative to an explicit home directory.
    pub fn with_home(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }

    /// Returns the base directory (~/.faceprint).
    pub fn base_dir(&self) -> PathBuf {
        self.home_dir.join(DEFAULT_BASE_DIR)
    }

    /// Returns the config file path (~/.faceprint/config.yaml).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir().join(DEFAULT_CONFIG_FILE)
    }

    /// Returns the data directory (~/.faceprint/data).
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir().join("data")
    }

    /// Returns the default database path (~/.faceprint/data/faces.redb).
    pub fn default_db_path(&self) -> PathBuf {
        self.data_dir().join(DEFAULT_DB_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_structure() {
        let paths = Paths::with_home("/home/alice");

        assert_eq!(paths.base_dir(), PathBuf::from("/home/alice/.faceprint"));
        assert!(paths.config_file().ends_with(".faceprint/config.yaml"));
        assert!(paths.data_dir().ends_with(".faceprint/data"));
        assert!(paths.default_db_path().ends_with("data/faces.redb"));
    }
}

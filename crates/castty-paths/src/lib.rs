use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found — set $HOME environment variable")]
    HomeNotFound,
}

/// Centralized path construction for the `~/.castty/` directory layout.
///
/// Single source of truth for every path under `~/.castty/`. Use `resolve()` in
/// production code and `from_dir()` in tests.
#[derive(Debug, Clone)]
pub struct CasttyPaths {
    castty_dir: PathBuf,
}

impl CasttyPaths {
    /// Resolve paths from the user's home directory (`~/.castty`).
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self {
            castty_dir: home.join(".castty"),
        })
    }

    /// Create paths from an explicit base directory. Use in tests.
    pub fn from_dir(castty_dir: PathBuf) -> Self {
        Self { castty_dir }
    }

    /// The base `~/.castty` directory.
    pub fn castty_dir(&self) -> &Path {
        &self.castty_dir
    }

    /// `~/.castty/config.toml` — monitor defaults overridable by CLI flags.
    pub fn user_config(&self) -> PathBuf {
        self.castty_dir.join("config.toml")
    }

    /// `~/.castty/certs/` — reserved for a future TLS front-end; unused today.
    pub fn certs_dir(&self) -> PathBuf {
        self.castty_dir.join("certs")
    }
}

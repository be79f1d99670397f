//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a small TOML file. The root folder holding
//! the database and the media directory is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `HARDNESS_ROOT_FOLDER`
//! 3. TOML config file `root_folder`
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted during root folder resolution
pub const ROOT_FOLDER_ENV: &str = "HARDNESS_ROOT_FOLDER";

/// Default bootstrap file name
pub const CONFIG_FILE_NAME: &str = "hardness.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder for the database and generated images
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Database file, relative to the root folder unless absolute
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Media directory for generated images, relative to the root folder unless absolute
    #[serde(default)]
    pub media_dir: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Surface plot configuration (optional)
    #[serde(default)]
    pub plot: PlotConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Surface plot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlotConfig {
    /// Reduction applied when several readings share one (block, depth) cell:
    /// `last`, `mean` or `max`
    #[serde(default = "default_reduction")]
    pub reduction: String,

    /// Output resolution in dots per inch
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            reduction: default_reduction(),
            dpi: default_dpi(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reduction() -> String {
    "last".to_string()
}

fn default_dpi() -> u32 {
    300
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
    }

    /// Load configuration if the file exists, otherwise fall back to defaults
    ///
    /// A missing or unreadable file never aborts startup.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => return Self::default(),
            },
        };

        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config: {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} - using defaults", e);
                Self::default()
            }
        }
    }
}

/// Platform config file location (`<config_dir>/soil-hardness/hardness.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("soil-hardness").join(CONFIG_FILE_NAME))
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("soil-hardness"))
            .unwrap_or_else(|| PathBuf::from("./soil_hardness_data"));

        Self {
            root_folder,
            log_level: default_log_level(),
        }
    }
}

/// Resolves the root folder following the documented priority order
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_root: toml_config.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and derives the paths that live under it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
    database: PathBuf,
    media_dir: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf, toml_config: &TomlConfig) -> Self {
        let database = resolve_under(
            &root_folder,
            toml_config.database.as_deref(),
            Path::new("hardness.db"),
        );
        let media_dir = resolve_under(
            &root_folder,
            toml_config.media_dir.as_deref(),
            Path::new("media"),
        );

        Self {
            root_folder,
            database,
            media_dir,
        }
    }

    /// Create the root folder and media directory if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(&self.media_dir)?;
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.clone()
    }

    pub fn media_dir(&self) -> PathBuf {
        self.media_dir.clone()
    }
}

fn resolve_under(root: &Path, configured: Option<&Path>, fallback: &Path) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => root.join(path),
        None => root.join(fallback),
    }
}

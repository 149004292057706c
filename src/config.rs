use std::path::PathBuf;

use color_eyre::eyre::{Result, WrapErr, eyre};
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG: &str = r#"# Path to the SQLite database file.
database = "~/.local/share/music-analytics/catalog.db"

# HTTP port for `music-analytics serve`.
port = 3000

# Catalog API credentials. The SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET
# environment variables are used when this section is absent.
# [spotify]
# client_id = ""
# client_secret = ""
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    database: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    spotify: Option<SpotifyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Default config file location under the platform config directory.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("music-analytics").join("config.toml"))
    }

    /// Load config from the default location.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or(eyre!("Config file not found"))?;

        Self::from_file(&config_path)
    }

    /// Write a commented default config file, unless one already exists.
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or(eyre!("No config directory available"))?;
        if path.exists() {
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&path, DEFAULT_CONFIG)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(&self, path: &str) -> PathBuf {
        if path.starts_with("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(&path[2..]);
        }
        PathBuf::from(path)
    }

    pub fn database_path(&self) -> PathBuf {
        self.expand_path(&self.database)
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Catalog credentials from the config file, falling back to the
    /// environment.
    pub fn spotify_config(&self) -> Result<SpotifyConfig> {
        if let Some(ref spotify) = self.spotify {
            return Ok(spotify.clone());
        }

        let client_id = std::env::var("SPOTIFY_CLIENT_ID");
        let client_secret = std::env::var("SPOTIFY_CLIENT_SECRET");
        match (client_id, client_secret) {
            (Ok(client_id), Ok(client_secret)) => Ok(SpotifyConfig {
                client_id,
                client_secret,
            }),
            _ => Err(eyre!(
                "Missing catalog credentials: set [spotify] in the config file or \
                 SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET in the environment"
            )),
        }
    }
}

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// The structure of our configuration file (config.toml)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Prebuilt frontend served for every path the API does not claim.
    pub static_dir: PathBuf,
    /// Netscape cookie file handed to yt-dlp, only when it exists on disk.
    pub cookies_file: PathBuf,
    pub ytdlp_path: PathBuf,
    /// Prefix a bare video id is appended to when resolving a download.
    pub watch_url_base: String,
    /// Upper bound on each chunk relayed to the client while proxying media.
    /// Chunks follow upstream reads, so they are often smaller.
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: 5001,
            static_dir: PathBuf::from("dist"),
            cookies_file: PathBuf::from("cookies.txt"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            watch_url_base: "https://www.youtube.com/watch?v=".to_string(),
            chunk_size: 1024 * 1024,
        }
    }
}

impl Config {
    /// Builds the canonical source URL for a bare video id.
    pub fn watch_url(&self, video_id: &str) -> String {
        format!("{}{}", self.watch_url_base, video_id)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Applies the `HOST` / `PORT` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.port = port
                .parse()
                .map_err(|e| anyhow!("PORT must be a valid port number, got '{}': {}", port, e))?;
        }
        Ok(())
    }
}

/// Returns the cross-platform path to the configuration file, creating the directory if needed.
async fn get_config_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "vidgrab", "vidgrab")
        .ok_or_else(|| anyhow!("Could not find a valid home directory to store config"))?;

    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir).await?;

    Ok(config_dir.join("config.toml"))
}

/// Parses a config file body. Missing keys fall back to their defaults.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| anyhow!("Invalid config: {}", e))
}

/// Loads the configuration.
///
/// An explicit path must exist. Without one, the per-user config file is used,
/// and a default one is written there if it doesn't exist yet.
pub async fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config_path = match explicit {
        Some(path) => {
            if !fs::try_exists(path).await? {
                return Err(anyhow!("Config file {} does not exist", path.display()));
            }
            path.to_path_buf()
        }
        None => {
            let path = get_config_path().await?;
            if !fs::try_exists(&path).await? {
                tracing::info!(
                    "No config file found. Creating a default one at: {}",
                    path.display()
                );
                let default_config = Config::default();
                save_config(&default_config, &path).await?;
                return Ok(default_config);
            }
            path
        }
    };

    let config_content = fs::read_to_string(&config_path).await?;
    parse_config(&config_content)
        .map_err(|e| anyhow!("Failed to parse config file at {}: {}", config_path.display(), e))
}

async fn save_config(config: &Config, path: &Path) -> Result<()> {
    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string).await?;
    Ok(())
}

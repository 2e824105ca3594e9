//! Configuration management for promptsmith
//!
//! Stores settings in ~/.config/promptsmith/config.json. The OpenRouter key
//! lives in the system keychain; `OPENROUTER_API_KEY` overrides it.

use crate::llm::{ClientSettings, DEFAULT_BASE_URL, DEFAULT_MODEL};
use anyhow::Context;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const KEYRING_SERVICE: &str = "promptsmith";
const KEYRING_USERNAME: &str = "openrouter_api_key";
const DEFAULT_LOG_FILTER: &str = "promptsmith=info";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Legacy plaintext key; moved into the keychain on first read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openrouter_api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub api_base_url: String,
    /// Where drafts, history, templates and the log live
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Destination for history exports
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Language for generated prompts; unset follows the prompt's language
    #[serde(default)]
    pub output_language: Option<String>,
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openrouter_api_key: None,
            model: default_model(),
            api_base_url: default_base_url(),
            data_dir: None,
            export_dir: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            output_language: None,
            log_filter: None,
        }
    }
}

fn keyring_disabled() -> bool {
    if cfg!(test) {
        return true;
    }
    matches!(
        std::env::var("PROMPTSMITH_DISABLE_KEYRING")
            .unwrap_or_default()
            .to_lowercase()
            .as_str(),
        "1" | "true" | "yes"
    )
}

fn keyring_entry() -> Result<Entry, keyring::Error> {
    Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
}

fn read_keyring_key() -> Result<Option<String>, keyring::Error> {
    if keyring_disabled() {
        return Ok(None);
    }
    match keyring_entry()?.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err),
    }
}

fn write_keyring_key(key: &str) -> Result<(), keyring::Error> {
    if keyring_disabled() {
        return Err(keyring::Error::NoStorageAccess(
            "keychain disabled by PROMPTSMITH_DISABLE_KEYRING".into(),
        ));
    }
    keyring_entry()?.set_password(key)
}

impl Config {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("promptsmith"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load from an explicit path. A corrupt file is set aside as
    /// `config.json.corrupt` and defaults are returned.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                eprintln!(
                    "  Warning: Config file was corrupted ({}). A backup was saved and defaults were loaded.",
                    err
                );
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path().context("Could not determine config directory")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
                    eprintln!("  Warning: Failed to set config directory permissions: {}", e);
                }
            }
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        write_config_atomic(path, &content).context("Failed to write config")
    }

    /// The OpenRouter API key: environment, then keychain, then legacy config
    pub fn get_api_key(&mut self) -> Option<String> {
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }

        match read_keyring_key() {
            Ok(Some(key)) => return Some(key),
            Ok(None) => {}
            Err(err) => {
                eprintln!("  Warning: Failed to read API key from system keychain: {}", err);
                eprintln!("  Tip: Set the OPENROUTER_API_KEY environment variable as a workaround.");
            }
        }

        let key = self.openrouter_api_key.clone()?;
        match write_keyring_key(&key) {
            Ok(()) => {
                if let Ok(Some(stored)) = read_keyring_key() {
                    if stored == key {
                        self.openrouter_api_key = None;
                        let _ = self.save();
                    }
                }
            }
            Err(err) => tracing::debug!("Legacy API key left in config: {}", err),
        }
        Some(key)
    }

    /// Store the API key in the keychain and drop any plaintext copy
    pub fn set_api_key(&mut self, key: &str) -> anyhow::Result<()> {
        write_keyring_key(key).map_err(|err| {
            anyhow::anyhow!(
                "Failed to store API key in system keychain: {}. \
                 You can set the OPENROUTER_API_KEY environment variable instead.",
                err
            )
        })?;

        match read_keyring_key() {
            Ok(Some(stored)) if stored == key => {
                self.openrouter_api_key = None;
                self.save()
            }
            Ok(_) => anyhow::bail!(
                "API key verification failed: the keychain did not return the stored key. \
                 You can set the OPENROUTER_API_KEY environment variable instead."
            ),
            Err(err) => anyhow::bail!(
                "API key verification failed: couldn't read back from keychain ({}).",
                err
            ),
        }
    }

    pub fn validate_api_key_format(key: &str) -> bool {
        key.starts_with("sk-")
    }

    /// The API base URL, checked to be an absolute http(s) URL
    pub fn base_url(&self) -> anyhow::Result<url::Url> {
        let parsed = url::Url::parse(self.api_base_url.trim())
            .with_context(|| format!("Invalid api_base_url '{}'", self.api_base_url))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => anyhow::bail!("api_base_url must use http or https, not '{}'", other),
        }
    }

    /// Data directory: explicit override, then config, then the platform data dir
    pub fn resolve_data_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        override_dir
            .map(Path::to_path_buf)
            .or_else(|| self.data_dir.clone())
            .or_else(|| dirs::data_dir().map(|d| d.join("promptsmith")))
            .unwrap_or_else(|| PathBuf::from(".promptsmith"))
    }

    pub fn resolve_export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Log filter directive: `PROMPTSMITH_LOG`, then config, then the default
    pub fn log_filter(&self) -> String {
        std::env::var("PROMPTSMITH_LOG")
            .ok()
            .filter(|f| !f.trim().is_empty())
            .or_else(|| self.log_filter.clone())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }

    pub fn client_settings(&mut self) -> anyhow::Result<ClientSettings> {
        let base_url = self.base_url()?;
        Ok(ClientSettings {
            api_key: self.get_api_key(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            model: self.model.clone(),
            timeout_secs: self.request_timeout_secs.max(1),
            output_language: self
                .output_language
                .clone()
                .filter(|l| !l.trim().is_empty()),
        })
    }

    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/promptsmith/config.json".to_string())
    }
}

/// Interactive prompt to set up the API key
pub fn setup_api_key_interactive() -> anyhow::Result<String> {
    use std::io;

    println!();
    println!("  ┌─────────────────────────────────────────────────────────┐");
    println!("  │  OPENROUTER SETUP                                       │");
    println!("  └─────────────────────────────────────────────────────────┘");
    println!();
    println!("  promptsmith uses OpenRouter to select techniques and rewrite prompts.");
    println!();
    println!("  1. Get an API key at: https://openrouter.ai/keys");
    println!("  2. Paste it below (saved in your system keychain)");
    println!();
    print!("  API Key: ");
    io::stdout().flush()?;

    let mut key = String::new();
    io::stdin().read_line(&mut key)?;
    let key = key.trim().to_string();
    if key.is_empty() {
        anyhow::bail!("No API key provided");
    }

    if !Config::validate_api_key_format(&key) {
        println!();
        println!("  Warning: Key doesn't look like an OpenRouter key (should start with sk-)");
        println!("     Saving anyway...");
    }

    let mut config = Config::load();
    config.set_api_key(&key)?;

    println!();
    println!("  + API key saved. Settings live in {}", Config::config_location());
    println!();
    Ok(key)
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
            eprintln!("  Warning: Failed to set temp config file permissions: {}", e);
        }
    }

    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

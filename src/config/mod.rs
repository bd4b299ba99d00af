
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the Gemini API key. Takes precedence over
/// `gemini.api_key` in the config file.
pub const API_KEY_ENV: &str = "GOOGLE_GEMINI_AI_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key, or a `${VAR}` reference to one
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name; `mock/*` selects the offline mock
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP timeout for model calls. Unset means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Cosmetic pause shown with the "Wait for it..." spinner before a call
    #[serde(default = "default_wait_delay_ms")]
    pub wait_delay_ms: u64,

    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,

    /// Transcript width for the terminal renderer
    #[serde(default = "default_terminal_width")]
    pub terminal_width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind")]
    pub bind: String,

    /// Request body limit for image uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_wait_delay_ms() -> u64 {
    2000
}
fn default_thumbnail_width() -> u32 {
    300
}
fn default_terminal_width() -> usize {
    100
}
fn default_port() -> u16 {
    8501
}
fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            model: default_model(),
            timeout_secs: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            wait_delay_ms: default_wait_delay_ms(),
            thumbnail_width: default_thumbnail_width(),
            terminal_width: default_terminal_width(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load from `path`, or the default location when `None`. A missing
    /// file is created from the template on first run.
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;

        if !path.exists() {
            let config = Config::default();
            config.save_with_template_to(&path)?;
            return Ok(config);
        }

        Self::read(&path)
    }

    /// Like [`Config::load_from`] but never writes: a missing file yields
    /// the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if path.exists() {
            Self::read(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// `path` with `~` expanded, or the default location when `None`.
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(shellexpand::tilde(p).to_string())),
            None => Self::config_path(),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gemini.model.trim().is_empty() {
            anyhow::bail!("gemini.model cannot be empty");
        }

        let url = Regex::new(r"^https?://[^\s/]+")?;
        if !url.is_match(&self.gemini.base_url) {
            anyhow::bail!(
                "Invalid gemini.base_url: {}. Expected an http(s) URL",
                self.gemini.base_url
            );
        }

        if self.gemini.timeout_secs == Some(0) {
            anyhow::bail!("gemini.timeout_secs must be greater than 0 (omit it to disable)");
        }

        if self.ui.terminal_width < 20 {
            anyhow::bail!(
                "ui.terminal_width must be at least 20 (got {})",
                self.ui.terminal_width
            );
        }

        if self.server.max_upload_bytes == 0 {
            anyhow::bail!("server.max_upload_bytes must be greater than 0");
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!("Unknown logging.level: {}", other),
        }

        Ok(())
    }

    /// Resolve the API key: environment first, then the config file.
    /// References in the file are expanded here so `save` never writes a
    /// resolved secret back.
    pub fn gemini_api_key(&self) -> Option<String> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.gemini.api_key.as_deref())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    /// Save config with a helpful template (for first-time setup)
    pub fn save_with_template_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", path.display());

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

        Ok(base.home_dir().join(".gemini-vision-chat").join("config.toml"))
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["gemini", "model"] => Ok(self.gemini.model.clone()),
            ["gemini", "base_url"] => Ok(self.gemini.base_url.clone()),
            ["gemini", "timeout_secs"] => Ok(self
                .gemini
                .timeout_secs
                .map(|t| t.to_string())
                .unwrap_or_default()),
            ["gemini", "api_key"] => Ok(if self.gemini.api_key.is_some() {
                "(set)".to_string()
            } else {
                String::new()
            }),
            ["ui", "wait_delay_ms"] => Ok(self.ui.wait_delay_ms.to_string()),
            ["ui", "thumbnail_width"] => Ok(self.ui.thumbnail_width.to_string()),
            ["ui", "terminal_width"] => Ok(self.ui.terminal_width.to_string()),
            ["server", "port"] => Ok(self.server.port.to_string()),
            ["server", "bind"] => Ok(self.server.bind.clone()),
            ["server", "max_upload_bytes"] => Ok(self.server.max_upload_bytes.to_string()),
            ["logging", "level"] => Ok(self.logging.level.clone()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["gemini", "model"] => self.gemini.model = value.to_string(),
            ["gemini", "base_url"] => self.gemini.base_url = value.to_string(),
            ["gemini", "timeout_secs"] => {
                self.gemini.timeout_secs = if value.is_empty() {
                    None
                } else {
                    Some(value.parse()?)
                }
            }
            ["gemini", "api_key"] => {
                self.gemini.api_key = Some(value.to_string()).filter(|v| !v.is_empty())
            }
            ["ui", "wait_delay_ms"] => self.ui.wait_delay_ms = value.parse()?,
            ["ui", "thumbnail_width"] => self.ui.thumbnail_width = value.parse()?,
            ["ui", "terminal_width"] => self.ui.terminal_width = value.parse()?,
            ["server", "port"] => self.server.port = value.parse()?,
            ["server", "bind"] => self.server.bind = value.to_string(),
            ["server", "max_upload_bytes"] => self.server.max_upload_bytes = value.parse()?,
            ["logging", "level"] => self.logging.level = value.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        self.validate()
    }
}

fn resolve_api_key(from_env: Option<String>, from_file: Option<&str>) -> Option<String> {
    let from_env = from_env.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    from_env.or_else(|| {
        from_file
            .map(|k| expand_env(k.trim()))
            // An unresolved `${VAR}` reference is not a key
            .filter(|k| !k.is_empty() && !k.starts_with('$'))
    })
}

fn expand_env(s: &str) -> String {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else if let Some(var_name) = s.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| s.to_string())
    } else {
        s.to_string()
    }
}

/// Default config template with helpful comments (used for first-time setup)
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Gemini Vision Chat Configuration
# Auto-created on first run. Edit as needed.

[gemini]
# The API key is read from GOOGLE_GEMINI_AI_KEY when set.
# Otherwise set it here, directly or as an env reference:
# api_key = "${GOOGLE_GEMINI_AI_KEY}"
model = "gemini-2.0-flash"
base_url = "https://generativelanguage.googleapis.com/v1beta"
# timeout_secs = 120

[ui]
# Pause shown with the "Wait for it..." spinner (0 disables)
wait_delay_ms = 2000
thumbnail_width = 300
terminal_width = 100

[server]
port = 8501
bind = "127.0.0.1"
max_upload_bytes = 20971520

[logging]
level = "info"
"#;

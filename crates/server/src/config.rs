use serde::Deserialize;

use exemptd_core::Settings;

/// Top-level TOML configuration for the server binary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub listen: ListenConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Exemption behavior (default category, webhooks, alert lead time).
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "ListenConfig::default_host")]
    pub host: String,
    #[serde(default = "ListenConfig::default_port")]
    pub port: u16,
}

impl ListenConfig {
    fn default_host() -> String {
        "127.0.0.1".to_owned()
    }

    fn default_port() -> u16 {
        8080
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

/// Secure download route settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    /// Shared secret the download token is derived from. An empty secret
    /// refuses every download.
    #[serde(default)]
    pub secret: String,

    /// Customer IDs allowed to download any certificate, not just their own.
    #[serde(default)]
    pub managers: Vec<u64>,

    /// Path prefix for the public routes.
    #[serde(default = "DownloadConfig::default_namespace")]
    pub namespace: String,
}

impl DownloadConfig {
    fn default_namespace() -> String {
        "exemptd/v1".to_owned()
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            managers: Vec::new(),
            namespace: Self::default_namespace(),
        }
    }
}

/// Remote tax-service record sync.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_token: String,
}

/// Expiration sweep schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Cron expression, evaluated in the configured settings time zone.
    #[serde(default = "ScannerConfig::default_cron")]
    pub cron: String,

    /// Also run one sweep at process start.
    #[serde(default = "ScannerConfig::default_run_on_start")]
    pub run_on_start: bool,
}

impl ScannerConfig {
    fn default_cron() -> String {
        "0 8 * * *".to_owned()
    }

    fn default_run_on_start() -> bool {
        true
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            cron: Self::default_cron(),
            run_on_start: Self::default_run_on_start(),
        }
    }
}

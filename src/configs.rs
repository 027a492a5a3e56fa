use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::subject::Subject;

pub const DEFAULT_CONFIG_PATH: &str = "pki-deploy.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub ca: CaDefaults,
    #[serde(default)]
    pub intermediate: IntermediateDefaults,
    #[serde(default)]
    pub leaf: LeafDefaults,
    #[serde(default)]
    pub trust: TrustConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_ca_dir")]
    pub ca_dir: PathBuf,
    #[serde(default = "default_certs_dir")]
    pub certs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            ca_dir: default_ca_dir(),
            certs_dir: default_certs_dir(),
        }
    }
}

fn default_ca_dir() -> PathBuf {
    PathBuf::from("ca")
}

fn default_certs_dir() -> PathBuf {
    PathBuf::from("certs")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CaDefaults {
    #[serde(default = "default_ca_cn")]
    pub common_name: String,
    #[serde(default = "default_ca_org")]
    pub organization: String,
    #[serde(default = "default_ca_ou")]
    pub organizational_unit: String,
    #[serde(default = "default_ca_country")]
    pub country: String,
    #[serde(default = "default_ca_state")]
    pub state: String,
    #[serde(default = "default_ca_locality")]
    pub locality: String,
    #[serde(default = "default_ca_email")]
    pub email: String,
    #[serde(default = "default_ca_validity")]
    pub validity_days: u32,
    #[serde(default = "default_key_bits")]
    pub key_bits: u32,
}

impl Default for CaDefaults {
    fn default() -> Self {
        Self {
            common_name: default_ca_cn(),
            organization: default_ca_org(),
            organizational_unit: default_ca_ou(),
            country: default_ca_country(),
            state: default_ca_state(),
            locality: default_ca_locality(),
            email: default_ca_email(),
            validity_days: default_ca_validity(),
            key_bits: default_key_bits(),
        }
    }
}

impl CaDefaults {
    /// Root subject built from these defaults, with the prompted organization
    /// and common name taking precedence.
    pub fn subject(&self, organization: &str, common_name: &str) -> Subject {
        Subject {
            country: self.country.clone(),
            state: self.state.clone(),
            locality: self.locality.clone(),
            organization: organization.to_string(),
            organizational_unit: self.organizational_unit.clone(),
            common_name: common_name.to_string(),
            email: self.email.clone(),
        }
    }
}

fn default_ca_cn() -> String {
    "Private Root CA".to_string()
}

fn default_ca_org() -> String {
    "Private Infrastructure".to_string()
}

fn default_ca_ou() -> String {
    "Operations".to_string()
}

fn default_ca_country() -> String {
    "US".to_string()
}

fn default_ca_state() -> String {
    "California".to_string()
}

fn default_ca_locality() -> String {
    "San Francisco".to_string()
}

fn default_ca_email() -> String {
    "pki@example.com".to_string()
}

fn default_ca_validity() -> u32 {
    3650 // 10 years
}

fn default_key_bits() -> u32 {
    4096
}

#[derive(Debug, Deserialize, Clone)]
pub struct IntermediateDefaults {
    /// Falls back to "<CA common name> Intermediate" when unset.
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default = "default_intermediate_validity")]
    pub validity_days: u32,
    #[serde(default = "default_key_bits")]
    pub key_bits: u32,
}

impl Default for IntermediateDefaults {
    fn default() -> Self {
        Self {
            common_name: None,
            validity_days: default_intermediate_validity(),
            key_bits: default_key_bits(),
        }
    }
}

impl IntermediateDefaults {
    pub fn common_name_for(&self, ca_common_name: &str) -> String {
        match &self.common_name {
            Some(cn) if !cn.trim().is_empty() => cn.trim().to_string(),
            _ => format!("{} Intermediate", ca_common_name),
        }
    }
}

fn default_intermediate_validity() -> u32 {
    1825 // 5 years
}

#[derive(Debug, Deserialize, Clone)]
pub struct LeafDefaults {
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_leaf_validity")]
    pub validity_days: u32,
    #[serde(default = "default_key_bits")]
    pub key_bits: u32,
}

impl Default for LeafDefaults {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            validity_days: default_leaf_validity(),
            key_bits: default_key_bits(),
        }
    }
}

fn default_domain() -> String {
    "example.com".to_string()
}

fn default_leaf_validity() -> u32 {
    365
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrustConfig {
    #[serde(default = "default_anchor_dir")]
    pub anchor_dir: PathBuf,
    #[serde(default = "default_anchor_name")]
    pub anchor_name: String,
    #[serde(default = "default_refresh_command")]
    pub refresh_command: Vec<String>,
    #[serde(default = "default_system_bundle")]
    pub system_bundle: PathBuf,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            anchor_dir: default_anchor_dir(),
            anchor_name: default_anchor_name(),
            refresh_command: default_refresh_command(),
            system_bundle: default_system_bundle(),
        }
    }
}

fn default_anchor_dir() -> PathBuf {
    PathBuf::from("/usr/local/share/ca-certificates")
}

fn default_anchor_name() -> String {
    "pki-deploy-ca.crt".to_string()
}

fn default_refresh_command() -> Vec<String> {
    vec!["update-ca-certificates".to_string()]
}

fn default_system_bundle() -> PathBuf {
    PathBuf::from("/etc/ssl/certs/ca-certificates.crt")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_user")]
    pub user: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default = "default_ssl_dir")]
    pub ssl_dir: String,
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
    /// Public key installed by the copy-key action. When unset the first
    /// existing of `~/.ssh/id_ed25519.pub` and `~/.ssh/id_rsa.pub` is used.
    #[serde(default)]
    pub public_key: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            user: default_remote_user(),
            port: default_ssh_port(),
            ssl_dir: default_ssl_dir(),
            staging_dir: default_staging_dir(),
            public_key: None,
        }
    }
}

fn default_remote_user() -> String {
    "root".to_string()
}

fn default_ssh_port() -> u16 {
    22
}

fn default_ssl_dir() -> String {
    "/etc/ssl/private".to_string()
}

fn default_staging_dir() -> String {
    "/tmp".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(config_str).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load the given file, or built-in defaults when no path was given and
    /// the default file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

// ABOUTME: Configuration types and parsing for ekdosi.yml.
// ABOUTME: Handles YAML parsing, env var references, and app selection.

mod env_value;
mod policy;

pub use env_value::EnvValue;
pub use policy::{BackoffPolicy, PollPolicy, PushPolicy, RolloutPolicy};

use crate::error::{Error, Result};
use crate::types::{AppName, DeploymentTarget, ImageRef};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "ekdosi.yml";
pub const CONFIG_FILENAME_ALT: &str = "ekdosi.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".ekdosi/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub registry: RegistryConfig,

    pub platform: PlatformConfig,

    #[serde(deserialize_with = "deserialize_apps")]
    pub apps: NonEmpty<AppConfig>,

    /// Mutable alias tag applied alongside every revision tag.
    #[serde(default = "default_alias_tag")]
    pub alias_tag: String,

    #[serde(default)]
    pub push: PushPolicy,

    #[serde(default)]
    pub rollout: RolloutPolicy,
}

/// Registry host and credentials used for every push in a run.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    pub host: String,
    pub username: EnvValue,
    pub password: EnvValue,
}

/// Control API of the compute platform that runs the apps.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    pub endpoint: String,

    #[serde(default)]
    pub token: Option<EnvValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(deserialize_with = "deserialize_app_name")]
    pub name: AppName,

    /// Repository under the configured registry host, e.g. "acme/webapp".
    pub repository: String,

    #[serde(default)]
    pub build: BuildConfig,

    pub target: DeploymentTarget,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_context")]
    pub context: PathBuf,

    /// Dockerfile path relative to the build context.
    #[serde(default = "default_dockerfile")]
    pub dockerfile: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            context: default_build_context(),
            dockerfile: default_dockerfile(),
        }
    }
}

fn default_build_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_dockerfile() -> PathBuf {
    PathBuf::from("Dockerfile")
}

fn default_alias_tag() -> String {
    "latest".to_string()
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Cross-field checks serde cannot express: unique app names and
    /// repositories that form a valid reference under the registry host.
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for app in &self.apps {
            if !seen.insert(app.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate app name: {}",
                    app.name
                )));
            }
            self.image_base(app)?;
        }
        Ok(())
    }

    /// The app's repository under the registry host, carrying the alias tag.
    /// Revision tags are derived from this with `with_tag`.
    pub fn image_base(&self, app: &AppConfig) -> Result<ImageRef> {
        ImageRef::new(&self.registry.host, &app.repository, &self.alias_tag)
            .map_err(|e| Error::InvalidConfig(format!("app {}: {}", app.name, e)))
    }

    /// All apps, or just the named one.
    pub fn select_apps(&self, name: Option<&str>) -> Result<Vec<&AppConfig>> {
        match name {
            None => Ok(self.apps.iter().collect()),
            Some(name) => {
                let app = self
                    .apps
                    .iter()
                    .find(|a| a.name.as_str() == name)
                    .ok_or_else(|| Error::UnknownApp(name.to_string()))?;
                Ok(vec![app])
            }
        }
    }

    pub fn template() -> Self {
        Config {
            registry: RegistryConfig {
                host: "registry.example.com".to_string(),
                username: EnvValue::FromEnv {
                    var: "EKDOSI_REGISTRY_USER".to_string(),
                    default: None,
                },
                password: EnvValue::FromEnv {
                    var: "EKDOSI_REGISTRY_PASSWORD".to_string(),
                    default: None,
                },
            },
            platform: PlatformConfig {
                endpoint: "http://localhost:8080".to_string(),
                token: None,
            },
            apps: NonEmpty::new(AppConfig {
                name: AppName::new("my-app").unwrap(),
                repository: "acme/my-app".to_string(),
                build: BuildConfig::default(),
                target: DeploymentTarget {
                    app: AppName::new("my-app").unwrap(),
                    group: "default".to_string(),
                    port: 8000,
                },
            }),
            alias_tag: default_alias_tag(),
            push: PushPolicy::default(),
            rollout: RolloutPolicy::default(),
        }
    }
}

pub fn init_config(
    dir: &Path,
    app: Option<&str>,
    repository: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(name) = app {
        let name = AppName::new(name).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.apps.head.target.app = name.clone();
        config.apps.head.name = name;
    }

    if let Some(repo) = repository {
        config.apps.head.repository = repo.to_string();
        config.image_base(config.apps.first())?;
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let app = config.apps.first();
    format!(
        r#"registry:
  host: {}
  username:
    env: EKDOSI_REGISTRY_USER
  password:
    env: EKDOSI_REGISTRY_PASSWORD

platform:
  endpoint: {}

apps:
  - name: {}
    repository: {}
    build:
      context: .
      dockerfile: Dockerfile
    target:
      app: {}
      group: {}
      port: {}
"#,
        config.registry.host,
        config.platform.endpoint,
        app.name,
        app.repository,
        app.target.app,
        app.target.group,
        app.target.port,
    )
}

// Custom deserializers

fn deserialize_app_name<'de, D>(deserializer: D) -> std::result::Result<AppName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    AppName::new(&s).map_err(serde::de::Error::custom)
}

fn deserialize_apps<'de, D>(deserializer: D) -> std::result::Result<NonEmpty<AppConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<AppConfig> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(values).ok_or_else(|| serde::de::Error::custom("at least one app is required"))
}

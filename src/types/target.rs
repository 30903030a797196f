// ABOUTME: Identity of an app on the compute platform.
// ABOUTME: Names the group, app, and ingress port an update addresses.

use super::AppName;
use serde::{Deserialize, Deserializer};

/// Where a rollout lands: a named app inside a platform resource group,
/// listening on a fixed ingress port.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentTarget {
    #[serde(deserialize_with = "deserialize_app_name")]
    pub app: AppName,
    #[serde(deserialize_with = "deserialize_group")]
    pub group: String,
    pub port: u16,
}

impl DeploymentTarget {
    /// Stable identity used for lock naming and log context.
    pub fn identity(&self) -> String {
        format!("{}/{}", self.group, self.app)
    }
}

fn deserialize_app_name<'de, D>(deserializer: D) -> Result<AppName, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    AppName::new(&value).map_err(serde::de::Error::custom)
}

fn deserialize_group<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(serde::de::Error::custom("target group cannot be empty"));
    }
    Ok(value)
}

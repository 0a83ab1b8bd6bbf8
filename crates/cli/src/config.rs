//! Working-directory configuration: `config.json` and the optional `hosts` file.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const CONFIG_FILE: &str = "config.json";
pub const HOSTS_FILE: &str = "hosts";
pub const SERVER_HOST: &str = "ui-recorder-server";
pub const DEFAULT_PATH_ATTRS: &str = "data-id,data-name,type,data-type,data-role,data-value";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Test variables available to `setVar` steps.
    #[serde(default)]
    pub vars: Map<String, Value>,
    pub webdriver: Option<String>,
    pub upload_dir: Option<String>,
    pub path_attrs: Option<String>,
}

impl RecorderConfig {
    pub fn bindings(&self) -> BTreeMap<String, Value> {
        self.vars
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Read `config.json`. A missing or malformed file is fatal.
pub async fn load_config(path: &Path) -> Result<RecorderConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Host overrides for the browsers: the `hosts` file in `dir`, if any, plus
/// a line pointing the recorder server name at this machine.
pub async fn load_hosts(dir: &Path) -> Result<String> {
    let path = dir.join(HOSTS_FILE);
    let mut hosts = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    if !hosts.is_empty() && !hosts.ends_with('\n') {
        hosts.push('\n');
    }
    hosts.push_str(&format!("{} {}", local_ip(), SERVER_HOST));
    Ok(hosts)
}

/// Address of the interface used for outbound traffic. Connecting a UDP
/// socket sends nothing.
fn local_ip() -> IpAddr {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{
                "vars": { "user": "alice", "age": 30 },
                "webdriver": "http://127.0.0.1:4444",
                "uploadDir": "/srv/uploads"
            }"#,
        )
        .unwrap();

        let config = load_config(&path).await.unwrap();

        assert_eq!(config.webdriver.as_deref(), Some("http://127.0.0.1:4444"));
        assert_eq!(config.upload_dir.as_deref(), Some("/srv/uploads"));
        assert_eq!(config.path_attrs, None);
        assert_eq!(config.bindings().get("user"), Some(&Value::from("alice")));
        assert_eq!(config.bindings().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_object_is_valid() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{}").unwrap();

        assert_eq!(load_config(&path).await.unwrap(), RecorderConfig::default());
    }

    #[tokio::test]
    async fn test_missing_config_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let err = load_config(&temp_dir.path().join(CONFIG_FILE)).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[tokio::test]
    async fn test_malformed_config_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ vars: ").unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[tokio::test]
    async fn test_hosts_appends_server_line() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(HOSTS_FILE), "10.0.0.1 api.test").unwrap();

        let hosts = load_hosts(temp_dir.path()).await.unwrap();
        let lines: Vec<&str> = hosts.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "10.0.0.1 api.test");
        assert!(lines[1].ends_with(" ui-recorder-server"));
    }

    #[tokio::test]
    async fn test_hosts_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let hosts = load_hosts(temp_dir.path()).await.unwrap();
        assert_eq!(hosts.lines().count(), 1);
    }
}

//! Runtime configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::Result;

use crate::export::DEFAULT_EXPORT_FILE;

const APP_NAME: &str = "mindful";
const DATABASE_FILE: &str = "mindful.db";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the database and default exports (from MINDFUL_DATA_DIR)
    pub data_dir: PathBuf,
    /// Bind address for the HTTP API (from MINDFUL_HOST)
    pub host: String,
    /// Port for the HTTP API (from MINDFUL_PORT)
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match lookup("MINDFUL_DATA_DIR") {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_data_dir()?,
        };

        let host = lookup("MINDFUL_HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("MINDFUL_PORT") {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid MINDFUL_PORT {:?}, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Ok(Self {
            data_dir,
            host,
            port,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn export_path(&self) -> PathBuf {
        self.data_dir.join(DEFAULT_EXPORT_FILE)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_all_variables() {
        let config = Config::from_lookup(lookup(&[
            ("MINDFUL_DATA_DIR", "/tmp/mindful-data"),
            ("MINDFUL_HOST", "0.0.0.0"),
            ("MINDFUL_PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/mindful-data"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/mindful-data/mindful.db"));
        assert_eq!(config.export_path(), PathBuf::from("/tmp/mindful-data/goal-graph.json"));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        let config = Config::from_lookup(lookup(&[
            ("MINDFUL_DATA_DIR", "/tmp/x"),
            ("MINDFUL_PORT", "not-a-port"),
        ]))
        .unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, DEFAULT_HOST);
    }
}

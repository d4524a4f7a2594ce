//! Config discovery (spec.md §6: "a per-user config directory holds
//! tracker-API credentials"). `swm` reads one TOML file up front, layering
//! CLI flags over it, so the daemon never has to re-ask where its
//! collaborators live on every crank.

use std::fs;

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::args::Cli;

/// One environment's set of external endpoints: production and staging
/// each get their own, so `--staging` is a single config swap rather than
/// a pile of per-flag overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    pub tracker_base_url: String,
    pub snap_store_base_url: String,
    pub git_tag_service_base_url: String,
    pub amqp_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            tracker_base_url: "https://api.launchpad.net/devel".to_string(),
            snap_store_base_url: "https://api.snapcraft.io".to_string(),
            git_tag_service_base_url: "https://git.launchpad.net".to_string(),
            amqp_url: "amqp://localhost:5672/%2f".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    production: Option<Endpoints>,
    #[serde(default)]
    staging: Option<Endpoints>,
    #[serde(default)]
    catalog_path: Option<Utf8PathBuf>,
    #[serde(default)]
    credentials_path: Option<Utf8PathBuf>,
    #[serde(default)]
    email_config_path: Option<Utf8PathBuf>,
}

/// The resolved configuration for one `swm` invocation: endpoints for the
/// environment the CLI flags selected, plus on-disk file locations.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoints: Endpoints,
    pub catalog_path: Utf8PathBuf,
    pub credentials_path: Utf8PathBuf,
    pub email_config_path: Utf8PathBuf,
}

impl Config {
    /// Discover and load the config file, then apply CLI overrides
    /// (`--staging` selects the staging endpoint set, `--local-msgqueue-port`
    /// rewrites the AMQP port). Precedence: CLI flags > config file >
    /// built-in defaults -- the same precedence order the teacher's own
    /// CLI config layering follows.
    pub fn discover(cli: &Cli) -> anyhow::Result<Self> {
        let path = cli
            .config
            .clone()
            .or_else(Self::default_config_path)
            .and_then(|p| p.exists().then_some(p));

        let raw = match path {
            Some(p) => {
                let text = fs::read_to_string(&p)
                    .map_err(|e| anyhow::anyhow!("reading config file {p}: {e}"))?;
                toml::from_str(&text)
                    .map_err(|e| anyhow::anyhow!("parsing config file {p}: {e}"))?
            }
            None => RawConfig::default(),
        };

        let endpoints = if cli.staging {
            raw.staging.unwrap_or_default()
        } else {
            raw.production.unwrap_or_default()
        };
        let mut endpoints = endpoints;
        if let Some(port) = cli.local_msgqueue_port {
            endpoints.amqp_url = format!("amqp://localhost:{port}/%2f");
        }

        let config_dir = Self::config_dir();
        Ok(Self {
            endpoints,
            catalog_path: raw
                .catalog_path
                .unwrap_or_else(|| config_dir.join("kernel-series.yaml")),
            credentials_path: raw
                .credentials_path
                .unwrap_or_else(|| config_dir.join("credentials")),
            email_config_path: raw
                .email_config_path
                .unwrap_or_else(|| camino::Utf8PathBuf::from("email.yaml")),
        })
    }

    fn config_dir() -> Utf8PathBuf {
        dirs::config_dir()
            .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."))
            .join("swm")
    }

    fn default_config_path() -> Option<Utf8PathBuf> {
        Some(Self::config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn missing_config_file_falls_back_to_production_defaults() {
        let cli = Cli::parse_from(["swm", "--config", "/nonexistent/swm.toml"]);
        let config = Config::discover(&cli).unwrap();
        assert_eq!(config.endpoints.tracker_base_url, Endpoints::default().tracker_base_url);
    }

    #[test]
    fn staging_flag_selects_staging_endpoints_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[production]
tracker_base_url = "https://prod.example/api"
snap_store_base_url = "https://prod.example/snaps"
git_tag_service_base_url = "https://prod.example/git"
amqp_url = "amqp://prod.example/%2f"

[staging]
tracker_base_url = "https://staging.example/api"
snap_store_base_url = "https://staging.example/snaps"
git_tag_service_base_url = "https://staging.example/git"
amqp_url = "amqp://staging.example/%2f"
"#,
        )
        .unwrap();
        let cli = Cli::parse_from([
            "swm",
            "--staging",
            "--config",
            path.to_str().unwrap(),
        ]);
        let config = Config::discover(&cli).unwrap();
        assert_eq!(config.endpoints.tracker_base_url, "https://staging.example/api");
    }

    #[test]
    fn local_msgqueue_port_rewrites_amqp_url() {
        let cli = Cli::parse_from(["swm", "--local-msgqueue-port", "15672"]);
        let config = Config::discover(&cli).unwrap();
        assert_eq!(config.endpoints.amqp_url, "amqp://localhost:15672/%2f");
    }
}

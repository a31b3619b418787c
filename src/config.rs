use anyhow::{Context, Result};
use clap_serde_derive::ClapSerde;
use serde::Deserialize;

#[derive(ClapSerde, Deserialize, Debug)]
pub struct Config {
    /// The address the listener binds to
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub(crate) address: String,

    /// The port the listener binds to
    #[arg(short, long, env, default_value = "25566")]
    pub(crate) port: u16,

    /// Directory holding model artifacts as <uid>/<model_name>
    #[arg(short, long, env, default_value = "models")]
    pub(crate) model_dir: String,

    /// Base URL of the model bucket, takes precedence over the model directory when set
    #[arg(long, env, default_value = "")]
    pub(crate) model_bucket_url: String,

    /// OTLP endpoint to export traces and metrics to
    #[arg(long, env, default_value = "")]
    pub(crate) otel_endpoint: String,

    /// Keep logging to the console while exporting to OTLP
    #[arg(long, env, default_value = "false")]
    pub(crate) console: bool,

    /// PEM certificate used to serve over TLS
    #[arg(long, env, default_value = "")]
    pub(crate) tls_cert: String,

    /// PEM private key used to serve over TLS
    #[arg(long, env, default_value = "")]
    pub(crate) tls_key: String,
}

impl Config {
    pub fn from_toml(path: &str) -> Result<Self> {
        let str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {path}"))?;
        let config = toml::from_str(&str)?;
        Ok(config)
    }

    pub fn otel_endpoint(&self) -> Option<&str> {
        non_empty(&self.otel_endpoint)
    }

    pub fn model_bucket_url(&self) -> Option<&str> {
        non_empty(&self.model_bucket_url)
    }

    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        non_empty(&self.tls_cert).zip(non_empty(&self.tls_key))
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_toml_file() {
        let path = std::env::temp_dir().join(format!("weave-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "address = \"127.0.0.1\"\nport = 8080\nmodel_dir = \"/srv/models\"\nmodel_bucket_url = \"\"\notel_endpoint = \"\"\nconsole = false\ntls_cert = \"\"\ntls_key = \"\"\n",
        )
        .unwrap();

        let config = Config::from_toml(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.model_dir, "/srv/models");
        assert!(config.model_bucket_url().is_none());
        assert!(config.tls_paths().is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::from_toml("/nonexistent/WeaveRunner.toml").is_err());
    }

    #[test]
    fn tls_requires_both_paths() {
        let mut config = Config::default();
        config.tls_cert = "cert.pem".into();
        assert!(config.tls_paths().is_none());
        config.tls_key = "key.pem".into();
        assert_eq!(config.tls_paths(), Some(("cert.pem", "key.pem")));
    }
}

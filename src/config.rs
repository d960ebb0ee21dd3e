use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PortMapping {
    pub container: String,
    pub host: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Name of the container that gets replaced on every push.
    pub container: String,
    pub repository: String,
    pub tag: String,
    pub command: Vec<String>,
    pub ports: Vec<PortMapping>,
    /// Seconds the engine waits before killing the old container.
    pub stop_timeout: i64,
}

impl TargetConfig {
    pub fn image(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            container: "app".to_string(),
            repository: "jfbrandhorst/grpcweb-example".to_string(),
            tag: "latest".to_string(),
            command: vec!["--host".to_string(), "demo.jbrandhorst.com".to_string()],
            ports: vec![PortMapping {
                container: "443/tcp".to_string(),
                host: "443".to_string(),
            }],
            stop_timeout: 5,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CallbackConfig {
    pub description: String,
    pub context: String,
    pub target_url: String,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            description: "Redeploy was successful".to_string(),
            context: "docker-webhook-receiver".to_string(),
            target_url: "https://demo.jbrandhorst.com".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PrometheusConfig {
    pub address: String,
    pub port: u16,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 9080,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Configuration {
    pub address: String,
    pub port: u16,
    /// Callback URLs must start with this for a notification to be considered.
    pub trusted_prefix: String,
    pub target: TargetConfig,
    pub callback: CallbackConfig,
    pub prometheus: PrometheusConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            trusted_prefix: "https://registry.hub.docker.com/u/jfbrandhorst/grpcweb-example"
                .to_string(),
            target: TargetConfig::default(),
            callback: CallbackConfig::default(),
            prometheus: PrometheusConfig::default(),
        }
    }
}

impl Configuration {
    pub fn figment(configs: Vec<PathBuf>) -> Figment {
        let fig = Figment::from(Serialized::defaults(Configuration::default()));

        let fig = configs
            .into_iter()
            .fold(fig, |fig, config_path| fig.merge(Yaml::file(config_path)));

        fig.merge(Env::prefixed("HUBHOOK_").split("__"))
    }

    pub fn config(figment: Figment) -> Result<Configuration> {
        let config: Configuration = figment.extract().context("Failed to load configuration")?;

        if config.trusted_prefix.is_empty() {
            bail!("trusted_prefix must not be empty");
        }

        if config.target.container.is_empty() {
            bail!("target.container must not be empty");
        }

        if config.target.stop_timeout < 0 {
            bail!("target.stop_timeout must not be negative");
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = Configuration::config(Configuration::figment(vec![]))
                .expect("Defaults should be valid");

            assert_eq!(config.listen_addr(), "0.0.0.0:8080");
            assert_eq!(config.target.container, "app");
            assert_eq!(config.target.image(), "jfbrandhorst/grpcweb-example:latest");
            assert_eq!(config.target.command, vec!["--host", "demo.jbrandhorst.com"]);
            assert_eq!(
                config.target.ports,
                vec![PortMapping {
                    container: "443/tcp".into(),
                    host: "443".into()
                }]
            );
            assert_eq!(config.target.stop_timeout, 5);

            Ok(())
        });
    }

    /// Later files win, including for lists
    #[test]
    fn stacking() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "base.yaml",
                r#"
                {
                  "target": {
                    "container": "web",
                    "repository": "example/web"
                  }
                }
                "#,
            )?;

            jail.create_file(
                "override.yaml",
                r#"
                {
                  "target": {
                    "tag": "stable",
                    "command": ["--verbose"]
                  }
                }
                "#,
            )?;

            let config = Configuration::config(Configuration::figment(vec![
                jail.directory().join("base.yaml"),
                jail.directory().join("override.yaml"),
            ]))
            .expect("Configuration should be parseable");

            assert_eq!(config.target.container, "web");
            assert_eq!(config.target.image(), "example/web:stable");
            assert_eq!(config.target.command, vec!["--verbose"]);
            assert_eq!(config.target.stop_timeout, 5);

            Ok(())
        });
    }

    #[test]
    fn environment() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("HUBHOOK_PORT", "9000");
            jail.set_env(
                "HUBHOOK_TRUSTED_PREFIX",
                "https://registry.hub.docker.com/u/someone/else",
            );
            jail.set_env("HUBHOOK_TARGET__CONTAINER", "other");

            let config = Configuration::config(Configuration::figment(vec![]))
                .expect("Configuration should be parseable");

            assert_eq!(config.listen_addr(), "0.0.0.0:9000");
            assert_eq!(
                config.trusted_prefix,
                "https://registry.hub.docker.com/u/someone/else"
            );
            assert_eq!(config.target.container, "other");

            Ok(())
        });
    }

    #[test]
    fn empty_prefix_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.yaml", r#"{ "trusted_prefix": "" }"#)?;

            let result = Configuration::config(Configuration::figment(vec![
                jail.directory().join("config.yaml"),
            ]));

            assert!(result.is_err());

            Ok(())
        });
    }
}

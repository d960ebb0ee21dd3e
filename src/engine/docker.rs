use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::{
    Docker,
    container::{
        Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
        StopContainerOptions,
    },
    errors::Error as DockerError,
    image::CreateImageOptions,
    models::{HostConfig, PortBinding},
};
use futures::TryStreamExt;
use tracing::debug;

use crate::{config::TargetConfig, engine::ContainerEngine};

pub(crate) struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects using `DOCKER_HOST`, falling back to the local socket.
    pub fn from_env() -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().context("Failed to create docker client")?;

        Ok(Self { docker })
    }
}

pub(crate) fn container_config(target: &TargetConfig, image: &str) -> Config<String> {
    let mut port_bindings = HashMap::new();

    for port in &target.ports {
        port_bindings.insert(
            port.container.clone(),
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(port.host.clone()),
            }]),
        );
    }

    Config {
        image: Some(image.to_string()),
        cmd: Some(target.command.clone()),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        host_config: Some(HostConfig {
            port_bindings: Some(port_bindings),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Attached volumes always go with the container.
pub(crate) fn remove_options(force: bool) -> RemoveContainerOptions {
    RemoveContainerOptions {
        v: true,
        force,
        ..Default::default()
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn image_of(&self, name: &str) -> Result<Option<String>> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(container) => Ok(container.image),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(err) => Err(err).context(format!("Failed to inspect container {name}")),
        }
    }

    async fn stop(&self, name: &str, timeout: i64) -> Result<()> {
        self.docker
            .stop_container(name, Some(StopContainerOptions { t: timeout }))
            .await
            .context(format!("Failed to stop container {name}"))
    }

    async fn remove(&self, name: &str, force: bool) -> Result<()> {
        self.docker
            .remove_container(name, Some(remove_options(force)))
            .await
            .context(format!("Failed to remove container {name}"))
    }

    async fn pull(&self, repository: &str, tag: &str) -> Result<()> {
        let progress: Vec<_> = self
            .docker
            .create_image(
                Some(CreateImageOptions {
                    from_image: repository.to_string(),
                    tag: tag.to_string(),
                    ..Default::default()
                }),
                None,
                None,
            )
            .try_collect()
            .await
            .context(format!("Failed to pull {repository}:{tag}"))?;

        if let Some(status) = progress.last().and_then(|info| info.status.as_ref()) {
            debug!(repository, tag, %status, "Pull finished");
        }

        Ok(())
    }

    async fn create(&self, target: &TargetConfig, image: &str) -> Result<String> {
        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: target.container.clone(),
                    ..Default::default()
                }),
                container_config(target, image),
            )
            .await
            .context(format!("Failed to create container {}", target.container))?;

        for warning in &created.warnings {
            debug!(container = %target.container, %warning, "Engine warning");
        }

        Ok(created.id)
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.docker
            .start_container::<String>(id, None)
            .await
            .context(format!("Failed to start container {id}"))
    }
}

use anyhow::Result;
use async_trait::async_trait;

use crate::config::TargetConfig;

pub(crate) use docker::DockerEngine;

mod docker;

/// The subset of container engine operations needed to replace a container.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Image id the named container was created from, or `None` if there is
    /// no such container.
    async fn image_of(&self, name: &str) -> Result<Option<String>>;

    async fn stop(&self, name: &str, timeout: i64) -> Result<()>;

    /// Removes the named container along with its volumes.
    async fn remove(&self, name: &str, force: bool) -> Result<()>;

    async fn pull(&self, repository: &str, tag: &str) -> Result<()>;

    /// Creates the target container from `image` and returns its id.
    async fn create(&self, target: &TargetConfig, image: &str) -> Result<String>;

    async fn start(&self, id: &str) -> Result<()>;
}

use std::{fmt, sync::Arc};

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{config::TargetConfig, engine::ContainerEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Stop,
    Remove,
    Pull,
    Create,
    Start,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Stop => "stop",
            Step::Remove => "remove",
            Step::Pull => "pull",
            Step::Create => "create",
            Step::Start => "start",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{step} step failed")]
pub struct RedeployError {
    pub step: Step,
    #[source]
    pub source: anyhow::Error,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelValue, Debug)]
enum Outcome {
    Succeeded,
    Failed,
    RolledBack,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct RedeployLabels {
    outcome: Outcome,
}

/// Replaces the target container with one running the newest image.
pub struct Redeployer {
    target: TargetConfig,
    engine: Arc<dyn ContainerEngine>,
    in_flight: Mutex<()>,
    redeploys_total: Family<RedeployLabels, Counter>,
}

impl Redeployer {
    pub fn new(
        target: TargetConfig,
        engine: Arc<dyn ContainerEngine>,
        registry: &mut Registry,
    ) -> Self {
        let redeploys_total = Family::<RedeployLabels, Counter>::default();
        registry.register(
            "redeploys",
            "Number of redeploys attempted",
            redeploys_total.clone(),
        );

        Self {
            target,
            engine,
            in_flight: Mutex::new(()),
            redeploys_total,
        }
    }

    pub async fn redeploy(&self) -> Result<(), RedeployError> {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                info!(
                    container = %self.target.container,
                    "Waiting for in-flight redeploy to finish"
                );
                self.in_flight.lock().await
            }
        };

        let previous = match self.engine.image_of(&self.target.container).await {
            Ok(image) => image,
            Err(err) => {
                warn!("Could not determine current image, no fallback available: {err:?}");
                None
            }
        };

        let result = self.replace().await;

        let outcome = match &result {
            Ok(()) => {
                info!(container = %self.target.container, "Container restarted successfully");
                Outcome::Succeeded
            }
            Err(RedeployError { step, .. }) if matches!(step, Step::Create | Step::Start) => {
                match previous {
                    Some(image) => self.fall_back(*step, &image).await,
                    None => Outcome::Failed,
                }
            }
            Err(_) => Outcome::Failed,
        };

        self.redeploys_total
            .get_or_create(&RedeployLabels { outcome })
            .inc();

        result
    }

    async fn replace(&self) -> Result<(), RedeployError> {
        let target = &self.target;
        let engine = &self.engine;

        engine
            .stop(&target.container, target.stop_timeout)
            .await
            .map_err(|source| RedeployError {
                step: Step::Stop,
                source,
            })?;

        engine
            .remove(&target.container, false)
            .await
            .map_err(|source| RedeployError {
                step: Step::Remove,
                source,
            })?;

        engine
            .pull(&target.repository, &target.tag)
            .await
            .map_err(|source| RedeployError {
                step: Step::Pull,
                source,
            })?;

        let id = engine
            .create(target, &target.image())
            .await
            .map_err(|source| RedeployError {
                step: Step::Create,
                source,
            })?;

        engine.start(&id).await.map_err(|source| RedeployError {
            step: Step::Start,
            source,
        })
    }

    /// Best effort attempt to bring the previous image back up.
    async fn fall_back(&self, failed: Step, image: &str) -> Outcome {
        let target = &self.target;
        warn!(container = %target.container, image, "Falling back to previous image");

        if failed == Step::Start {
            if let Err(err) = self.engine.remove(&target.container, true).await {
                error!("Failed to clear new container before fallback: {err:?}");
                return Outcome::Failed;
            }
        }

        let id = match self.engine.create(target, image).await {
            Ok(id) => id,
            Err(err) => {
                error!("Fallback create failed: {err:?}");
                return Outcome::Failed;
            }
        };

        match self.engine.start(&id).await {
            Ok(()) => {
                info!(container = %target.container, image, "Previous image restarted");
                Outcome::RolledBack
            }
            Err(err) => {
                error!("Fallback start failed: {err:?}");
                Outcome::Failed
            }
        }
    }
}

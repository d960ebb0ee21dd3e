use std::sync::Arc;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

use crate::{
    callback::CallbackClient, config::Configuration, engine::ContainerEngine, redeploy::Redeployer,
};

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
pub(crate) struct RequestLabels {
    pub status: String,
}

pub struct WebhookState {
    pub config: Configuration,
    pub callbacks: CallbackClient,
    pub redeployer: Redeployer,
    pub registry: Registry,
    pub(crate) requests_total: Family<RequestLabels, Counter>,
}

impl WebhookState {
    pub fn new(config: Configuration, engine: Arc<dyn ContainerEngine>) -> Self {
        let mut registry = Registry::with_prefix("hubhook");

        let requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "webhook_requests",
            "Number of webhook notifications received",
            requests_total.clone(),
        );

        let callbacks = CallbackClient::new(&mut registry);
        let redeployer = Redeployer::new(config.target.clone(), engine, &mut registry);

        Self {
            config,
            callbacks,
            redeployer,
            registry,
            requests_total,
        }
    }
}

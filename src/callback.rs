use anyhow::{Context, Result};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use tracing::debug;

use crate::notification::Acknowledgement;

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct CallbackMetricLabels {
    status: String,
}

pub(crate) struct CallbackClient {
    client: reqwest::Client,
    callbacks_total: Family<CallbackMetricLabels, Counter>,
}

impl CallbackClient {
    pub(crate) fn new(registry: &mut Registry) -> Self {
        let callbacks_total = Family::<CallbackMetricLabels, Counter>::default();
        registry.register(
            "callbacks_post",
            "Number of callback acknowledgements sent",
            callbacks_total.clone(),
        );

        Self {
            client: reqwest::Client::new(),
            callbacks_total,
        }
    }

    /// Posts `ack` to `url`. Any HTTP response counts as delivered, only
    /// transport failures are errors.
    pub(crate) async fn acknowledge(&self, url: &str, ack: &Acknowledgement) -> Result<()> {
        let resp = self.client.post(url).json(ack).send().await;

        match resp {
            Ok(r) => {
                let status = r.status().as_u16().to_string();
                debug!(url, %status, "Callback acknowledged");
                self.callbacks_total
                    .get_or_create(&CallbackMetricLabels { status })
                    .inc();
                Ok(())
            }
            Err(e) => {
                self.callbacks_total
                    .get_or_create(&CallbackMetricLabels {
                        status: "000".to_string(),
                    })
                    .inc();
                Err(e).context(format!("Failed to post callback to {url}"))
            }
        }
    }
}

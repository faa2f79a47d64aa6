//! Notification fan-out boundary.
//!
//! Transport mechanics (SMTP, push gateways, SMS providers) live behind
//! this trait in other services; the pipeline only owns the trigger
//! contract. Channel failures are counted and logged, never retried
//! synchronously, and never block alert persistence.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, warn};

use crate::domain::AlertRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Channel {
    Email,
    Push,
    Sms,
}

/// One alert subscriber and the channels they asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub channels: Vec<Channel>,
}

/// Per-alert delivery tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Fire-and-forget fan-out of one alert to a recipient set.
    async fn notify(&self, alert: &AlertRecord, recipients: &[Recipient])
        -> Result<DispatchOutcome>;
}

/// Default dispatcher: records every send in the log. Stands in for real
/// transports in single-node deployments and keeps the trigger contract
/// observable.
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn notify(
        &self,
        alert: &AlertRecord,
        recipients: &[Recipient],
    ) -> Result<DispatchOutcome> {
        let sends = recipients.iter().flat_map(|recipient| {
            recipient.channels.iter().map(move |channel| async move {
                info!(
                    alert_id = %alert.id,
                    location = %alert.location_id,
                    severity = %alert.severity,
                    recipient = %recipient.id,
                    %channel,
                    "alert notification dispatched"
                );
                true
            })
        });

        let results = join_all(sends).await;
        let delivered = results.iter().filter(|ok| **ok).count();
        let failed = results.len() - delivered;
        if failed > 0 {
            warn!(alert_id = %alert.id, failed, "some notification channels failed");
        }

        Ok(DispatchOutcome { delivered, failed })
    }
}

//! Alert evaluation: threshold ladder, quiet hours, deduplication,
//! notification fan-out.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Deserialize;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::aqi;
use crate::domain::{
    AlertRecord, MonitoredLocation, Pollutant, Sample, SampleSource, Severity,
};
use crate::repo::{AlertRepository, SampleRepository};

use super::notify::{NotificationDispatcher, Recipient};

/// One rung of the threshold ladder.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TierConfig {
    pub enabled: bool,
    pub min_index: u16,
}

/// The severity threshold ladder. Each rung can be switched independently;
/// the moderate rung ships disabled so routine "moderate" days do not page
/// anyone.
#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdLadder {
    pub moderate: TierConfig,
    pub unhealthy_sensitive: TierConfig,
    pub unhealthy: TierConfig,
    pub very_unhealthy: TierConfig,
}

impl Default for ThresholdLadder {
    fn default() -> Self {
        Self {
            moderate: TierConfig {
                enabled: false,
                min_index: 100,
            },
            unhealthy_sensitive: TierConfig {
                enabled: true,
                min_index: 101,
            },
            unhealthy: TierConfig {
                enabled: true,
                min_index: 151,
            },
            very_unhealthy: TierConfig {
                enabled: true,
                min_index: 201,
            },
        }
    }
}

impl ThresholdLadder {
    /// Highest enabled tier the index reaches, if any.
    pub fn classify(&self, index: u16) -> Option<AlertTier> {
        let rungs = [
            (AlertTier::VeryUnhealthy, self.very_unhealthy),
            (AlertTier::Unhealthy, self.unhealthy),
            (AlertTier::UnhealthySensitive, self.unhealthy_sensitive),
            (AlertTier::Moderate, self.moderate),
        ];
        rungs
            .into_iter()
            .find(|(_, cfg)| cfg.enabled && index >= cfg.min_index)
            .map(|(tier, _)| tier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertTier {
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
}

impl AlertTier {
    pub fn severity(&self) -> Severity {
        match self {
            AlertTier::Moderate | AlertTier::UnhealthySensitive => Severity::Moderate,
            AlertTier::Unhealthy => Severity::High,
            AlertTier::VeryUnhealthy => Severity::Critical,
        }
    }

    /// The top tier is never suppressed by quiet hours.
    pub fn bypasses_quiet_hours(&self) -> bool {
        matches!(self, AlertTier::VeryUnhealthy)
    }

    pub fn message(&self) -> &'static str {
        match self {
            AlertTier::Moderate => "Air quality is moderate",
            AlertTier::UnhealthySensitive => "Air quality is unhealthy for sensitive groups",
            AlertTier::Unhealthy => "Air quality is unhealthy",
            AlertTier::VeryUnhealthy => "Air quality is very unhealthy",
        }
    }

    pub fn health_impact(&self) -> &'static str {
        match self {
            AlertTier::Moderate => {
                "Unusually sensitive people should consider reducing prolonged outdoor exertion."
            }
            AlertTier::UnhealthySensitive => {
                "People with heart or lung disease, older adults and children should reduce \
                 prolonged outdoor exertion."
            }
            AlertTier::Unhealthy => {
                "Everyone may begin to experience health effects; sensitive groups should avoid \
                 outdoor exertion."
            }
            AlertTier::VeryUnhealthy => {
                "Health warnings of emergency conditions: everyone should avoid outdoor activity."
            }
        }
    }
}

/// Daily suppression window. Supports overnight wraparound
/// (e.g. 22:00–07:00); an equal start and end disables the window.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: 22,
            end_hour: 7,
        }
    }
}

impl QuietHours {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.start_hour == self.end_hour {
            return false;
        }
        let hour = now.hour();
        if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    /// How far back to look for a usable live sample.
    pub lookback_minutes: i64,
    /// Window of the one-alert-per-(location, severity) invariant.
    pub dedup_minutes: i64,
    pub quiet_hours: QuietHours,
    pub thresholds: ThresholdLadder,
    pub recipients: Vec<Recipient>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            lookback_minutes: 180,
            dedup_minutes: 60,
            quiet_hours: QuietHours::default(),
            thresholds: ThresholdLadder::default(),
            recipients: Vec::new(),
        }
    }
}

/// Per-location evaluation: each sweep moves a location through
/// Normal, Alerting and back purely as a function of the latest samples,
/// the ladder, and the dedup window; no state is carried between sweeps.
pub struct AlertEvaluator {
    samples: Arc<dyn SampleRepository>,
    alerts: Arc<dyn AlertRepository>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    cfg: AlertConfig,
}

impl AlertEvaluator {
    pub fn new(
        samples: Arc<dyn SampleRepository>,
        alerts: Arc<dyn AlertRepository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        cfg: AlertConfig,
    ) -> Self {
        Self {
            samples,
            alerts,
            dispatcher,
            cfg,
        }
    }

    /// Run one evaluation cycle for a location. Returns the created alert,
    /// or `None` when nothing fired (normal conditions, quiet hours, or
    /// dedup suppression, all of which are expected outcomes, not errors).
    pub async fn evaluate_location(
        &self,
        location: &MonitoredLocation,
        now: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>> {
        let Some((index, dominant)) = self.current_index(location, now).await? else {
            debug!(location = %location.id, "no usable live samples, skipping evaluation");
            return Ok(None);
        };

        let Some(tier) = self.cfg.thresholds.classify(index) else {
            return Ok(None);
        };

        if self.cfg.quiet_hours.is_active(now) && !tier.bypasses_quiet_hours() {
            info!(
                location = %location.id,
                index,
                severity = %tier.severity(),
                "alert suppressed by quiet hours"
            );
            return Ok(None);
        }

        let severity = tier.severity();
        let dedup_since = now - Duration::minutes(self.cfg.dedup_minutes);
        if let Some(existing) = self
            .alerts
            .find_recent(&location.id, severity, dedup_since)
            .await?
        {
            debug!(
                location = %location.id,
                %severity,
                existing = %existing.id,
                "alert suppressed by dedup window"
            );
            return Ok(None);
        }

        let record = AlertRecord::new(
            location.id.clone(),
            location.center.clone(),
            severity,
            index,
            dominant,
            tier.message(),
            tier.health_impact(),
            now,
        );
        let record = self.alerts.create(record).await?;
        info!(
            location = %location.id,
            alert_id = %record.id,
            severity = %record.severity,
            index,
            %dominant,
            "alert created"
        );

        match self
            .dispatcher
            .notify(&record, &self.cfg.recipients)
            .await
        {
            Ok(outcome) => {
                if outcome.failed > 0 {
                    warn!(
                        alert_id = %record.id,
                        delivered = outcome.delivered,
                        failed = outcome.failed,
                        "notification fan-out partially failed"
                    );
                }
            }
            // The alert stays persisted; delivery is best-effort.
            Err(e) => warn!(alert_id = %record.id, error = %e, "notification dispatch failed"),
        }

        Ok(Some(record))
    }

    /// Current index for a location: per pollutant, the newest usable
    /// sample within the lookback (ground stations beating satellite
    /// retrievals), rolled up to the maximum with first-in-order ties.
    async fn current_index(
        &self,
        location: &MonitoredLocation,
        now: DateTime<Utc>,
    ) -> Result<Option<(u16, Pollutant)>> {
        let since = now - Duration::minutes(self.cfg.lookback_minutes);
        let mut best: Option<(u16, Pollutant)> = None;

        for pollutant in Pollutant::iter() {
            let samples = self
                .samples
                .find_samples(pollutant, &location.area, since)
                .await?;
            let Some(sample) = preferred_sample(&samples) else {
                continue;
            };
            let Some(index) = aqi::compute_index(pollutant, sample.value, sample.unit) else {
                continue;
            };
            if best.map_or(true, |(current, _)| index > current) {
                best = Some((index, pollutant));
            }
        }

        Ok(best)
    }
}

/// Newest usable sample, preferring ground stations over satellite.
/// `samples` is expected in ascending timestamp order.
fn preferred_sample(samples: &[Sample]) -> Option<&Sample> {
    let usable = || samples.iter().rev().filter(|s| s.is_usable());
    usable()
        .find(|s| s.source == SampleSource::GroundStation)
        .or_else(|| usable().next())
}

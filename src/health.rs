//! Webhook health sweep.
//!
//! Probes every enabled link that has its own endpoint, classifies the
//! outcome into a [`HealthPatch`] and hands all patches to the store in one
//! batch. Persisting is the store's job; the sweep never writes directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::{group_service, HealthStatus};
use crate::error::Result;
use crate::webhook::{ProbeOutcome, WebhookClient};

/// Health fields for one link, as produced by a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthPatch {
    pub link_id: i32,
    pub status: HealthStatus,
    pub code: Option<i32>,
    pub checked_at: DateTime<Utc>,
}

impl HealthPatch {
    pub fn from_probe(link_id: i32, outcome: &ProbeOutcome, checked_at: DateTime<Utc>) -> Self {
        let (status, code) = match outcome {
            ProbeOutcome::Responded(code) => {
                (HealthStatus::from_status_code(*code), Some(i32::from(*code)))
            }
            ProbeOutcome::Failed(_) => (HealthStatus::Error, None),
        };
        Self { link_id, status, code, checked_at }
    }
}

/// Persistence seam for the sweep.
#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Links with `enabled = true` and a non-null `webhook_url`.
    async fn eligible_links(&self) -> Result<Vec<group_service::Model>>;

    /// Write every patch in a single transaction.
    async fn apply_health(&self, patches: &[HealthPatch]) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub ok: usize,
    pub missing: usize,
    pub error: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SweepReport {
    fn record(&mut self, status: HealthStatus) {
        self.checked += 1;
        match status {
            HealthStatus::Ok => self.ok += 1,
            HealthStatus::Missing => self.missing += 1,
            HealthStatus::Error | HealthStatus::Unconfigured => self.error += 1,
        }
    }
}

/// Run one sweep over all eligible links.
///
/// Probes run serially; a failing probe is recorded as `error` and never
/// stops the sweep. Only a failure to read or commit the store is returned.
pub async fn check_all_webhooks<S>(store: &S, client: &WebhookClient) -> Result<SweepReport>
where
    S: HealthStore + ?Sized,
{
    let started_at = Utc::now();
    let links = store.eligible_links().await?;

    let mut report = SweepReport { started_at: Some(started_at), ..Default::default() };
    let mut patches = Vec::with_capacity(links.len());

    for link in links.iter().filter(|l| l.enabled) {
        let Some(url) = link.configured_webhook() else {
            continue;
        };

        let outcome = client.probe(url).await;
        let patch = HealthPatch::from_probe(link.id, &outcome, Utc::now());

        if patch.status.is_broken() {
            tracing::warn!(
                link_id = link.id,
                group_id = link.group_id,
                service_id = link.service_id,
                code = ?patch.code,
                "Webhook unhealthy: {}",
                patch.status
            );
        }

        report.record(patch.status);
        patches.push(patch);
    }

    store.apply_health(&patches).await?;

    report.finished_at = Some(Utc::now());
    tracing::info!(
        checked = report.checked,
        ok = report.ok,
        missing = report.missing,
        error = report.error,
        "Webhook health sweep complete"
    );

    Ok(report)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::HealthStatus;
use crate::health::SweepReport;

// ─── Entity aliases ───

pub use crate::entities::group::Model as Group;
pub use crate::entities::group_service::Model as Link;
pub use crate::entities::service::Model as Service;

// ─── Request types ───

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub color: Option<String>,
    pub webhook_footer: Option<String>,
    pub webhook_footer_img: Option<String>,
    pub caption: Option<String>,
    pub webhook_url: Option<String>,
    /// Link every existing service to the new group, disabled.
    #[serde(default)]
    pub onboard_all_services: bool,
}

/// Display fields of a group. Absent fields are left alone; blank strings
/// clear the optional ones.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub webhook_footer: Option<String>,
    pub webhook_footer_img: Option<String>,
    pub caption: Option<String>,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

/// `service_ids: None` links every service not yet linked.
#[derive(Debug, Default, Deserialize)]
pub struct LinkServicesRequest {
    pub service_ids: Option<Vec<i32>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWebhookRequest {
    pub webhook_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinkFilter {
    pub group: Option<String>,
    pub service: Option<String>,
}

// ─── Views ───

/// A link joined with its group and service names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkView {
    pub id: i32,
    pub group_id: i32,
    pub group_name: String,
    pub service_id: i32,
    pub service_name: String,
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub webhook_updated_at: Option<DateTime<Utc>>,
    pub status_changed_at: Option<DateTime<Utc>>,
    pub health_status: Option<HealthStatus>,
    pub health_code: Option<i32>,
    pub health_checked_at: Option<DateTime<Utc>>,
}

impl LinkView {
    pub fn new(link: Link, group_name: String, service_name: String) -> Self {
        Self {
            id: link.id,
            group_id: link.group_id,
            group_name,
            service_id: link.service_id,
            service_name,
            enabled: link.enabled,
            webhook_url: link.webhook_url,
            webhook_updated_at: link.webhook_updated_at,
            status_changed_at: link.status_changed_at,
            health_status: link.health_status,
            health_code: link.health_code,
            health_checked_at: link.health_checked_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOverview {
    #[serde(flatten)]
    pub service: Service,
    pub total_links: usize,
    pub enabled_links: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    /// True when at least one linked service is enabled.
    pub any_enabled: bool,
    pub links: Vec<LinkView>,
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub report: SweepReport,
    pub broken: Vec<LinkView>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmationRequired {
    pub status: &'static str,
    pub message: String,
}

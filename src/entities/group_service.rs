use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Last known health of a link's webhook endpoint.
///
/// A link that has never been probed carries no status at all (`NULL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[sea_orm(string_value = "unconfigured")]
    Unconfigured,
    #[sea_orm(string_value = "ok")]
    Ok,
    /// The endpoint answered 401 or 404: deleted or revoked upstream.
    #[sea_orm(string_value = "missing")]
    Missing,
    #[sea_orm(string_value = "error")]
    Error,
}

impl HealthStatus {
    /// Classifies an HTTP status code returned by a webhook endpoint.
    pub fn from_status_code(code: u16) -> Self {
        match code {
            200..=299 => HealthStatus::Ok,
            401 | 404 => HealthStatus::Missing,
            _ => HealthStatus::Error,
        }
    }

    /// Whether the dashboard should flag this link as broken.
    pub fn is_broken(&self) -> bool {
        matches!(self, HealthStatus::Missing | HealthStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unconfigured => "unconfigured",
            HealthStatus::Ok => "ok",
            HealthStatus::Missing => "missing",
            HealthStatus::Error => "error",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub group_id: i32,
    pub service_id: i32,
    pub enabled: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub webhook_url: Option<String>,
    pub webhook_updated_at: Option<DateTimeUtc>,
    pub status_changed_at: Option<DateTimeUtc>,
    pub health_status: Option<HealthStatus>,
    pub health_code: Option<i32>,
    pub health_checked_at: Option<DateTimeUtc>,
}

impl Model {
    /// The link's own endpoint, if one is configured and not blank.
    pub fn configured_webhook(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id",
        on_delete = "Cascade"
    )]
    Service,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_codes() {
        assert_eq!(HealthStatus::from_status_code(200), HealthStatus::Ok);
        assert_eq!(HealthStatus::from_status_code(204), HealthStatus::Ok);
        assert_eq!(HealthStatus::from_status_code(299), HealthStatus::Ok);
        assert_eq!(HealthStatus::from_status_code(401), HealthStatus::Missing);
        assert_eq!(HealthStatus::from_status_code(404), HealthStatus::Missing);
        assert_eq!(HealthStatus::from_status_code(403), HealthStatus::Error);
        assert_eq!(HealthStatus::from_status_code(429), HealthStatus::Error);
        assert_eq!(HealthStatus::from_status_code(500), HealthStatus::Error);
        assert_eq!(HealthStatus::from_status_code(301), HealthStatus::Error);
    }

    #[test]
    fn blank_webhook_is_not_configured() {
        let mut link = Model {
            id: 1,
            group_id: 1,
            service_id: 1,
            enabled: true,
            webhook_url: Some("   ".to_string()),
            webhook_updated_at: None,
            status_changed_at: None,
            health_status: None,
            health_code: None,
            health_checked_at: None,
        };
        assert_eq!(link.configured_webhook(), None);

        link.webhook_url = Some("https://ok.example/x".to_string());
        assert_eq!(link.configured_webhook(), Some("https://ok.example/x"));
    }

    #[test]
    fn health_status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Missing).unwrap();
        assert_eq!(json, "\"missing\"");
        assert!(HealthStatus::Error.is_broken());
        assert!(!HealthStatus::Unconfigured.is_broken());
    }
}

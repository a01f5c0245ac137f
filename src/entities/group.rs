use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Hex colour without the leading `#`, e.g. `FF0000`.
    pub color: Option<String>,
    pub webhook_footer: Option<String>,
    pub webhook_footer_img: Option<String>,
    pub caption: Option<String>,
    /// Group-level fallback endpoint used by senders when a link has none.
    #[sea_orm(column_type = "Text", nullable)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::group_service::Entity")]
    GroupService,
}

impl Related<super::group_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupService.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Link registry: groups, services and the links routing one into the other.
//!
//! Every function runs as one unit of work against the database. Writes that
//! touch more than one row go through an explicit transaction.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entities::{group, group_service, service, HealthStatus};
use crate::error::{RegistryError, Result};
use crate::health::{HealthPatch, HealthStore};
use crate::models::{
    CreateGroupRequest, Group, GroupDetail, Link, LinkFilter, LinkView, Service, ServiceOverview,
    UpdateGroupRequest,
};
use crate::webhook::{ProbeOutcome, WebhookClient};

/// Trim a free-text field; blank becomes absent.
fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistryError::Validation(format!("{what} name must not be empty")));
    }
    Ok(name.to_string())
}

pub(crate) async fn find_group<C: ConnectionTrait>(db: &C, id: i32) -> Result<Group> {
    group::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| RegistryError::not_found("group", id))
}

pub(crate) async fn find_service<C: ConnectionTrait>(db: &C, id: i32) -> Result<Service> {
    service::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| RegistryError::not_found("service", id))
}

pub(crate) async fn find_link<C: ConnectionTrait>(db: &C, id: i32) -> Result<Link> {
    group_service::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| RegistryError::not_found("link", id))
}

// ─── Views ───

struct Names {
    groups: HashMap<i32, String>,
    services: HashMap<i32, String>,
}

impl Names {
    async fn load<C: ConnectionTrait>(db: &C) -> Result<Self> {
        let groups = group::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect();
        let services = service::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        Ok(Self { groups, services })
    }

    fn view(&self, link: Link) -> LinkView {
        let group_name = self.groups.get(&link.group_id).cloned().unwrap_or_default();
        let service_name = self.services.get(&link.service_id).cloned().unwrap_or_default();
        LinkView::new(link, group_name, service_name)
    }

    fn views(&self, links: Vec<Link>) -> Vec<LinkView> {
        links.into_iter().map(|l| self.view(l)).collect()
    }
}

async fn link_view<C: ConnectionTrait>(db: &C, link: Link) -> Result<LinkView> {
    let group_name = find_group(db, link.group_id).await?.name;
    let service_name = find_service(db, link.service_id).await?.name;
    Ok(LinkView::new(link, group_name, service_name))
}

fn sort_by_service_name(links: &mut [LinkView]) {
    links.sort_by_key(|l| l.service_name.to_lowercase());
}

fn group_detail(group: Group, mut links: Vec<LinkView>) -> GroupDetail {
    sort_by_service_name(&mut links);
    let any_enabled = links.iter().any(|l| l.enabled);
    GroupDetail { group, any_enabled, links }
}

// ─── Services ───

pub async fn create_service(db: &DatabaseConnection, name: &str) -> Result<Service> {
    let name = required_name(name, "service")?;

    let existing = service::Entity::find()
        .filter(service::Column::Name.eq(&name))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(RegistryError::Conflict(format!("service '{name}' already exists")));
    }

    let created = service::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(service_id = created.id, "Created service {}", created.name);
    Ok(created)
}

/// All services with their link counts, sorted by name.
pub async fn list_services(db: &DatabaseConnection) -> Result<Vec<ServiceOverview>> {
    let services = service::Entity::find()
        .order_by_asc(service::Column::Name)
        .all(db)
        .await?;
    let links = group_service::Entity::find().all(db).await?;

    let mut overview: Vec<ServiceOverview> = services
        .into_iter()
        .map(|service| {
            let linked = links.iter().filter(|l| l.service_id == service.id);
            let (total_links, enabled_links) =
                linked.fold((0, 0), |(t, e), l| (t + 1, e + usize::from(l.enabled)));
            ServiceOverview { service, total_links, enabled_links }
        })
        .collect();
    overview.sort_by_key(|o| o.service.name.to_lowercase());

    Ok(overview)
}

/// Delete a service together with all of its links.
pub async fn delete_service(db: &DatabaseConnection, service_id: i32) -> Result<()> {
    let txn = db.begin().await?;

    find_service(&txn, service_id).await?;
    let removed = group_service::Entity::delete_many()
        .filter(group_service::Column::ServiceId.eq(service_id))
        .exec(&txn)
        .await?
        .rows_affected;
    service::Entity::delete_by_id(service_id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(service_id, links_removed = removed, "Deleted service");
    Ok(())
}

/// Detach a service from every group. Returns the number of links removed.
pub async fn detach_service(db: &DatabaseConnection, service_id: i32) -> Result<u64> {
    find_service(db, service_id).await?;

    let removed = group_service::Entity::delete_many()
        .filter(group_service::Column::ServiceId.eq(service_id))
        .exec(db)
        .await?
        .rows_affected;

    tracing::info!(service_id, links_removed = removed, "Detached service from all groups");
    Ok(removed)
}

// ─── Groups ───

pub async fn create_group(db: &DatabaseConnection, req: CreateGroupRequest) -> Result<GroupDetail> {
    let name = required_name(&req.name, "group")?;
    let footer = normalize(req.webhook_footer).unwrap_or_else(|| name.clone());

    let txn = db.begin().await?;

    let created = group::ActiveModel {
        name: Set(name),
        color: Set(normalize(req.color)),
        webhook_footer: Set(Some(footer)),
        webhook_footer_img: Set(normalize(req.webhook_footer_img)),
        caption: Set(normalize(req.caption)),
        webhook_url: Set(normalize(req.webhook_url)),
        enabled: Set(true),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if req.onboard_all_services {
        let service_ids: Vec<i32> = service::Entity::find()
            .all(&txn)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        insert_links(&txn, created.id, &service_ids).await?;
    }

    txn.commit().await?;

    tracing::info!(group_id = created.id, "Created group {}", created.name);
    get_group(db, created.id).await
}

pub async fn get_group(db: &DatabaseConnection, group_id: i32) -> Result<GroupDetail> {
    let group = find_group(db, group_id).await?;
    let links = group_service::Entity::find()
        .filter(group_service::Column::GroupId.eq(group_id))
        .all(db)
        .await?;
    let names = Names::load(db).await?;

    Ok(group_detail(group, names.views(links)))
}

/// All groups with their links, groups by name and links by service name.
pub async fn list_groups(db: &DatabaseConnection) -> Result<Vec<GroupDetail>> {
    let groups = group::Entity::find()
        .order_by_asc(group::Column::Name)
        .all(db)
        .await?;
    let names = Names::load(db).await?;

    let mut by_group: HashMap<i32, Vec<LinkView>> = HashMap::new();
    for link in group_service::Entity::find().all(db).await? {
        by_group.entry(link.group_id).or_default().push(names.view(link));
    }

    let mut details: Vec<GroupDetail> = groups
        .into_iter()
        .map(|g| {
            let links = by_group.remove(&g.id).unwrap_or_default();
            group_detail(g, links)
        })
        .collect();
    details.sort_by_key(|d| d.group.name.to_lowercase());

    Ok(details)
}

pub async fn update_group(
    db: &DatabaseConnection,
    group_id: i32,
    req: UpdateGroupRequest,
) -> Result<Group> {
    let mut active = find_group(db, group_id).await?.into_active_model();

    if let Some(name) = req.name {
        active.name = Set(required_name(&name, "group")?);
    }
    if let Some(color) = req.color {
        active.color = Set(normalize(Some(color)));
    }
    if let Some(footer) = req.webhook_footer {
        active.webhook_footer = Set(normalize(Some(footer)));
    }
    if let Some(img) = req.webhook_footer_img {
        active.webhook_footer_img = Set(normalize(Some(img)));
    }
    if let Some(caption) = req.caption {
        active.caption = Set(normalize(Some(caption)));
    }
    if let Some(url) = req.webhook_url {
        active.webhook_url = Set(normalize(Some(url)));
    }

    Ok(active.update(db).await?)
}

/// Delete a group together with all of its links.
pub async fn delete_group(db: &DatabaseConnection, group_id: i32) -> Result<()> {
    let txn = db.begin().await?;

    find_group(&txn, group_id).await?;
    let removed = group_service::Entity::delete_many()
        .filter(group_service::Column::GroupId.eq(group_id))
        .exec(&txn)
        .await?
        .rows_affected;
    group::Entity::delete_by_id(group_id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(group_id, links_removed = removed, "Deleted group");
    Ok(())
}

// ─── Links ───

/// Insert disabled links for every service not yet linked to the group.
async fn insert_links<C: ConnectionTrait>(
    db: &C,
    group_id: i32,
    service_ids: &[i32],
) -> Result<Vec<Link>> {
    let existing: HashSet<i32> = group_service::Entity::find()
        .filter(group_service::Column::GroupId.eq(group_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.service_id)
        .collect();

    let mut seen = HashSet::new();
    let mut created = Vec::new();
    for &service_id in service_ids {
        if existing.contains(&service_id) || !seen.insert(service_id) {
            continue;
        }
        let link = group_service::ActiveModel {
            group_id: Set(group_id),
            service_id: Set(service_id),
            enabled: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await?;
        created.push(link);
    }

    Ok(created)
}

/// Route one service into a group. The new link starts disabled.
pub async fn link_service(db: &DatabaseConnection, group_id: i32, service_id: i32) -> Result<LinkView> {
    let group = find_group(db, group_id).await?;
    let service = find_service(db, service_id).await?;

    let existing = group_service::Entity::find()
        .filter(group_service::Column::GroupId.eq(group_id))
        .filter(group_service::Column::ServiceId.eq(service_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(RegistryError::Conflict(format!(
            "service '{}' is already linked to group '{}'",
            service.name, group.name
        )));
    }

    let link = group_service::ActiveModel {
        group_id: Set(group_id),
        service_id: Set(service_id),
        enabled: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(LinkView::new(link, group.name, service.name))
}

/// Link the selected services, skipping ones already linked.
pub async fn link_services(
    db: &DatabaseConnection,
    group_id: i32,
    service_ids: &[i32],
) -> Result<Vec<LinkView>> {
    let txn = db.begin().await?;

    find_group(&txn, group_id).await?;
    for &service_id in service_ids {
        find_service(&txn, service_id).await?;
    }
    let created = insert_links(&txn, group_id, service_ids).await?;

    txn.commit().await?;

    let names = Names::load(db).await?;
    Ok(names.views(created))
}

/// Link every service not yet linked to the group.
pub async fn link_all_services(db: &DatabaseConnection, group_id: i32) -> Result<Vec<LinkView>> {
    let txn = db.begin().await?;

    find_group(&txn, group_id).await?;
    let service_ids: Vec<i32> = service::Entity::find()
        .all(&txn)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    let created = insert_links(&txn, group_id, &service_ids).await?;

    txn.commit().await?;

    let names = Names::load(db).await?;
    Ok(names.views(created))
}

pub async fn unlink(db: &DatabaseConnection, link_id: i32) -> Result<()> {
    let link = find_link(db, link_id).await?;
    group_service::Entity::delete_by_id(link.id).exec(db).await?;

    tracing::info!(link_id, group_id = link.group_id, service_id = link.service_id, "Removed link");
    Ok(())
}

/// Enable or disable one link. Returns the link and whether it flipped;
/// only a flip stamps `status_changed_at`.
pub async fn set_link_enabled(
    db: &DatabaseConnection,
    link_id: i32,
    enabled: bool,
) -> Result<(LinkView, bool)> {
    let link = find_link(db, link_id).await?;
    if link.enabled == enabled {
        return Ok((link_view(db, link).await?, false));
    }

    let mut active = link.into_active_model();
    active.enabled = Set(enabled);
    active.status_changed_at = Set(Some(Utc::now()));
    let link = active.update(db).await?;

    Ok((link_view(db, link).await?, true))
}

/// Flip every link matching `scope` to `enabled`. Returns the links that
/// actually changed, with their new state.
async fn set_links_enabled(
    db: &DatabaseConnection,
    scope: group_service::Column,
    scope_id: i32,
    enabled: bool,
) -> Result<Vec<LinkView>> {
    let txn = db.begin().await?;

    let to_flip = group_service::Entity::find()
        .filter(scope.eq(scope_id))
        .filter(group_service::Column::Enabled.ne(enabled))
        .all(&txn)
        .await?;

    let now = Utc::now();
    if !to_flip.is_empty() {
        let ids: Vec<i32> = to_flip.iter().map(|l| l.id).collect();
        group_service::Entity::update_many()
            .set(group_service::ActiveModel {
                enabled: Set(enabled),
                status_changed_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(group_service::Column::Id.is_in(ids))
            .exec(&txn)
            .await?;
    }

    let names = Names::load(&txn).await?;
    txn.commit().await?;

    let mut flipped: Vec<LinkView> = to_flip
        .into_iter()
        .map(|mut link| {
            link.enabled = enabled;
            link.status_changed_at = Some(now);
            names.view(link)
        })
        .collect();
    sort_by_service_name(&mut flipped);

    Ok(flipped)
}

pub async fn set_group_links_enabled(
    db: &DatabaseConnection,
    group_id: i32,
    enabled: bool,
) -> Result<Vec<LinkView>> {
    find_group(db, group_id).await?;
    let flipped = set_links_enabled(db, group_service::Column::GroupId, group_id, enabled).await?;
    tracing::info!(group_id, enabled, flipped = flipped.len(), "Toggled group links");
    Ok(flipped)
}

pub async fn set_service_links_enabled(
    db: &DatabaseConnection,
    service_id: i32,
    enabled: bool,
) -> Result<Vec<LinkView>> {
    find_service(db, service_id).await?;
    let flipped =
        set_links_enabled(db, group_service::Column::ServiceId, service_id, enabled).await?;
    tracing::info!(service_id, enabled, flipped = flipped.len(), "Toggled service links");
    Ok(flipped)
}

/// Replace a link's endpoint after checking that it answers.
///
/// The candidate URL is probed first and saved only on a 2xx answer, which
/// also resets the link's health to `ok`.
pub async fn update_link_webhook(
    db: &DatabaseConnection,
    client: &WebhookClient,
    link_id: i32,
    url: &str,
) -> Result<LinkView> {
    let url = url.trim();
    if url.is_empty() {
        return Err(RegistryError::Validation("webhook_url must not be empty".into()));
    }
    let link = find_link(db, link_id).await?;

    let code = match client.probe(url).await {
        ProbeOutcome::Responded(code) => code,
        ProbeOutcome::Failed(e) => return Err(RegistryError::WebhookUnreachable(e)),
    };
    match HealthStatus::from_status_code(code) {
        HealthStatus::Ok => {}
        HealthStatus::Missing => return Err(RegistryError::WebhookMissing { status_code: code }),
        _ => return Err(RegistryError::WebhookRejected { status_code: code }),
    }

    let now = Utc::now();
    let mut active = link.into_active_model();
    active.webhook_url = Set(Some(url.to_string()));
    active.webhook_updated_at = Set(Some(now));
    active.health_status = Set(Some(HealthStatus::Ok));
    active.health_code = Set(Some(i32::from(code)));
    active.health_checked_at = Set(Some(now));
    let link = active.update(db).await?;

    tracing::info!(link_id, code, "Webhook updated");
    link_view(db, link).await
}

/// Remove a link's endpoint and mark it unconfigured.
pub async fn clear_link_webhook(db: &DatabaseConnection, link_id: i32) -> Result<LinkView> {
    let mut active = find_link(db, link_id).await?.into_active_model();
    active.webhook_url = Set(None);
    active.webhook_updated_at = Set(None);
    active.health_status = Set(Some(HealthStatus::Unconfigured));
    let link = active.update(db).await?;

    tracing::info!(link_id, "Webhook removed");
    link_view(db, link).await
}

/// Every link with names, optionally narrowed to one group and/or service
/// (names compared case-insensitively).
pub async fn list_links(db: &DatabaseConnection, filter: &LinkFilter) -> Result<Vec<LinkView>> {
    let names = Names::load(db).await?;
    let links = group_service::Entity::find().all(db).await?;

    let name_matches = |wanted: &Option<String>, actual: &str| match wanted.as_deref().map(str::trim) {
        Some(w) if !w.is_empty() => actual.eq_ignore_ascii_case(w),
        _ => true,
    };

    let mut views: Vec<LinkView> = names
        .views(links)
        .into_iter()
        .filter(|v| {
            name_matches(&filter.group, &v.group_name)
                && name_matches(&filter.service, &v.service_name)
        })
        .collect();
    views.sort_by_key(|v| (v.group_name.to_lowercase(), v.service_name.to_lowercase()));

    Ok(views)
}

/// Enabled links whose last known health is `missing` or `error`.
pub async fn broken_links(db: &DatabaseConnection) -> Result<Vec<LinkView>> {
    let links = group_service::Entity::find()
        .filter(group_service::Column::Enabled.eq(true))
        .all(db)
        .await?
        .into_iter()
        .filter(|l| l.health_status.is_some_and(|s| s.is_broken()))
        .collect();
    let names = Names::load(db).await?;

    let mut views = names.views(links);
    views.sort_by_key(|v| (v.group_name.to_lowercase(), v.service_name.to_lowercase()));
    Ok(views)
}

#[async_trait]
impl HealthStore for DatabaseConnection {
    async fn eligible_links(&self) -> Result<Vec<Link>> {
        Ok(group_service::Entity::find()
            .filter(group_service::Column::Enabled.eq(true))
            .filter(group_service::Column::WebhookUrl.is_not_null())
            .order_by_asc(group_service::Column::Id)
            .all(self)
            .await?)
    }

    async fn apply_health(&self, patches: &[HealthPatch]) -> Result<()> {
        let txn = self.begin().await?;

        for patch in patches {
            group_service::Entity::update_many()
                .set(group_service::ActiveModel {
                    health_status: Set(Some(patch.status)),
                    health_code: Set(patch.code),
                    health_checked_at: Set(Some(patch.checked_at)),
                    ..Default::default()
                })
                .filter(group_service::Column::Id.eq(patch.link_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }
}

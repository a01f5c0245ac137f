use std::path::Path;

use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
    TransactionTrait,
};

use crate::entities::{group, group_service, service};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    if let Some(path) = sqlite_file_path(database_url) {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tracing::info!("Database file: {path}");
    }

    let mut opts = ConnectOptions::new(database_url.to_owned());
    if database_url.contains(":memory:") {
        // every connection to :memory: opens a separate database
        opts.max_connections(1).min_connections(1);
    } else {
        opts.max_connections(5);
    }
    opts.sqlx_logging(false);

    let db = Database::connect(opts).await?;
    create_schema(&db).await?;

    Ok(db)
}

/// Create the tables and indexes if they don't exist yet.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, service::Entity).await?;
    create_table(db, &schema, group::Entity).await?;
    create_table(db, &schema, group_service::Entity).await?;

    let txn = db.begin().await?;
    merge_duplicate_links(&txn).await?;

    let pair_index = Index::create()
        .name("idx_group_services_group_service")
        .table(group_service::Entity)
        .col(group_service::Column::GroupId)
        .col(group_service::Column::ServiceId)
        .unique()
        .if_not_exists()
        .to_owned();
    txn.execute(backend.build(&pair_index)).await?;
    txn.commit().await?;

    tracing::info!("Database schema ready");
    Ok(())
}

/// Collapse rows sharing a (group_id, service_id) pair into the one with
/// the lowest id. The survivor is enabled if any of its duplicates was.
async fn merge_duplicate_links<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    db.execute_unprepared(
        "UPDATE group_services SET enabled = TRUE \
         WHERE id IN (SELECT MIN(id) FROM group_services GROUP BY group_id, service_id HAVING COUNT(*) > 1) \
         AND EXISTS (SELECT 1 FROM group_services d \
                     WHERE d.group_id = group_services.group_id \
                       AND d.service_id = group_services.service_id \
                       AND d.enabled = TRUE)",
    )
    .await?;

    let removed = db
        .execute_unprepared(
            "DELETE FROM group_services \
             WHERE id NOT IN (SELECT MIN(id) FROM group_services GROUP BY group_id, service_id)",
        )
        .await?
        .rows_affected();

    if removed > 0 {
        tracing::warn!(removed, "Merged duplicate group/service links");
    }
    Ok(())
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr> {
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    Ok(())
}

fn sqlite_file_path(database_url: &str) -> Option<&str> {
    let rest = database_url.strip_prefix("sqlite:")?;
    let rest = rest.trim_start_matches("//");
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(path)
    }
}

use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        "users",
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index_unique(bson::doc! { "username": 1 }),
        ],
    )
    .await?;

    // Workspaces
    create_indexes(
        db,
        "workspaces",
        vec![
            index_unique(bson::doc! { "invite_code": 1 }),
            index(bson::doc! { "owner_id": 1 }),
        ],
    )
    .await?;

    // Workspace Members
    create_indexes(
        db,
        "workspace_members",
        vec![
            index_unique(bson::doc! { "workspace_id": 1, "user_id": 1 }),
            index(bson::doc! { "user_id": 1 }),
        ],
    )
    .await?;

    // Attendance: the three-part composite key. Scoping the uniqueness to
    // the workspace lets one user hold records in two workspaces for the
    // same calendar date.
    create_indexes(
        db,
        "attendance_records",
        vec![
            index_unique(bson::doc! { "workspace_id": 1, "user_id": 1, "date": 1 }),
            index(bson::doc! { "workspace_id": 1, "date": 1 }),
        ],
    )
    .await?;

    // Rectification ledger
    create_indexes(
        db,
        "rectification_entries",
        vec![index_unique(
            bson::doc! { "workspace_id": 1, "user_id": 1, "month": 1, "year": 1 },
        )],
    )
    .await?;

    // Projects
    create_indexes(
        db,
        "projects",
        vec![index_unique(bson::doc! { "workspace_id": 1, "name": 1 })],
    )
    .await?;

    // Tasks
    create_indexes(
        db,
        "tasks",
        vec![
            index(bson::doc! { "workspace_id": 1, "status": 1, "created_at": -1 }),
            index(bson::doc! { "workspace_id": 1, "assignee_id": 1 }),
            index(bson::doc! { "project_id": 1 }),
        ],
    )
    .await?;

    // Activity logs
    create_indexes(
        db,
        "activity_logs",
        vec![
            index(bson::doc! { "workspace_id": 1, "created_at": -1 }),
            index(bson::doc! { "workspace_id": 1, "user_id": 1, "created_at": -1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::room_event;

/// Ensure required database indexes exist.
///
/// Schema sync creates tables and single-column constraints only, so
/// composite indexes are created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // `/messages` pagination: WHERE room_id = ? AND id < ? ORDER BY id
    let by_room = Index::create()
        .if_not_exists()
        .name("idx_room_event_room_id")
        .table(room_event::Entity)
        .col(room_event::Column::RoomId)
        .col(room_event::Column::Id)
        .to_owned();
    create_index(db, "idx_room_event_room_id", by_room).await;

    // Makes `/send` idempotent per client transaction.
    let by_txn = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_room_event_txn")
        .table(room_event::Entity)
        .col(room_event::Column::RoomId)
        .col(room_event::Column::Sender)
        .col(room_event::Column::TxnId)
        .to_owned();
    create_index(db, "idx_room_event_txn", by_txn).await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: IndexCreateStatement) {
    let stmt = db.get_database_backend().build(&stmt);
    match db.execute_raw(stmt).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}

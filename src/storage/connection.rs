use crate::storage::entity::{inventory_item, plot, supervisor, task};
use log::info;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use std::time::Duration;

pub async fn establish_connection(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());
    if is_memory_url(db_url) {
        // 内存库随连接销毁，只能保持单个常驻连接
        opt.max_connections(1)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8));
    } else {
        opt.max_connections(10)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(60))
            .max_lifetime(Duration::from_secs(600));
    }
    opt.sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    // 启用 WAL 模式
    db.execute(sea_orm::Statement::from_string(
        sea_orm::DatabaseBackend::Sqlite,
        "PRAGMA journal_mode=WAL;".to_string(),
    ))
    .await?;

    create_table(&db, plot::Entity).await?;
    create_table(&db, supervisor::Entity).await?;
    create_table(&db, task::Entity).await?;
    create_table(&db, inventory_item::Entity).await?;

    // 二级索引：按 field_manager_id / supervisor_id 查询，避免全表扫描
    for ddl in [
        "CREATE INDEX IF NOT EXISTS idx_supervisors_field_manager ON supervisors(field_manager_id);",
        "CREATE INDEX IF NOT EXISTS idx_plots_field_manager ON plots(field_manager_id);",
        "CREATE INDEX IF NOT EXISTS idx_tasks_supervisor ON tasks(supervisor_id);",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_plots_plot_number ON plots(plot_number);",
    ] {
        db.execute(sea_orm::Statement::from_string(
            sea_orm::DatabaseBackend::Sqlite,
            ddl.to_string(),
        ))
        .await?;
    }

    info!("Database connection established with WAL mode and tables initialized.");

    Ok(db)
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let stmt = builder.build(schema.create_table_from_entity(entity).if_not_exists());
    db.execute(stmt).await?;
    Ok(())
}

fn is_memory_url(db_url: &str) -> bool {
    db_url.contains(":memory:") || db_url.contains("mode=memory")
}

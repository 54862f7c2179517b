use rrv_core::AppConfig;

pub(crate) async fn run_ping(config: &AppConfig) -> anyhow::Result<()> {
    let pool = rrv_db::connect_pool_from_config(config).await?;
    rrv_db::ping(&pool).await?;
    println!("database reachable");
    Ok(())
}

pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = rrv_db::connect_pool_from_config(config).await?;
    let applied = rrv_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations complete");
    println!("applied {applied} migration(s)");
    Ok(())
}

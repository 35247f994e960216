//src/main.rs

use sipc::{
    config::{AppState, Settings},
    db,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let app_state = AppState::new(settings).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    db::run_migrations(&app_state.db_pool).await?;

    let low_stock = app_state
        .part_service
        .list_low_stock(app_state.settings.low_stock_report_limit)
        .await?;
    if low_stock.is_empty() {
        tracing::info!("Nenhuma peça abaixo do estoque mínimo.");
    } else {
        tracing::warn!("{} peça(s) no ou abaixo do estoque mínimo:", low_stock.len());
        for part in &low_stock {
            tracing::warn!(
                "  - {} (estoque {}, mínimo {})",
                part.name,
                part.stock_quantity,
                part.minimum_stock
            );
        }
    }

    tracing::info!("🚀 SIPC pronto.");
    Ok(())
}

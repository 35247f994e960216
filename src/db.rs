pub mod audit_repo;
pub use audit_repo::AuditRepository;
pub mod person_repo;
pub use person_repo::PersonRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod part_repo;
pub use part_repo::PartRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod supplier_repo;
pub use supplier_repo::SupplierRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod sale_repo;
pub use sale_repo::SaleRepository;
pub mod purchase_repo;
pub use purchase_repo::PurchaseRepository;
pub mod exchange_repo;
pub use exchange_repo::ExchangeRepository;

use sqlx::{postgres::PgRow, Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

/// Aplica as migrações de `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!().run(pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    Ok(())
}

// ---
// Helpers de status (soft delete) compartilhados por todas as tabelas com 'is_active'.
// O nome da tabela vem sempre de uma constante do repositório, nunca do usuário.
// ---

/// Define `is_active` e devolve a linha atualizada (`None` se o id não existe).
/// Chamadas repetidas com o mesmo valor deixam a linha no mesmo estado.
pub(crate) async fn set_active<'e, E, T>(
    executor: E,
    table: &'static str,
    id: Uuid,
    active: bool,
) -> Result<Option<T>, AppError>
where
    E: Executor<'e, Database = Postgres>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = format!(
        "UPDATE {table} SET is_active = $1, updated_at = NOW() WHERE id = $2 RETURNING *"
    );
    let row = sqlx::query_as::<_, T>(&sql)
        .bind(active)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Inverte `is_active` atomicamente.
pub(crate) async fn toggle_active<'e, E, T>(
    executor: E,
    table: &'static str,
    id: Uuid,
) -> Result<Option<T>, AppError>
where
    E: Executor<'e, Database = Postgres>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = format!(
        "UPDATE {table} SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING *"
    );
    let row = sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Busca uma linha pelo id. Com `lock`, usa `FOR UPDATE` (precisa estar numa transação).
pub(crate) async fn find_row<'e, E, T>(
    executor: E,
    table: &'static str,
    id: Uuid,
    lock: bool,
) -> Result<Option<T>, AppError>
where
    E: Executor<'e, Database = Postgres>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let suffix = if lock { " FOR UPDATE" } else { "" };
    let sql = format!("SELECT * FROM {table} WHERE id = $1{suffix}");
    let row = sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

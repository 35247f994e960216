// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{find_row, set_active, toggle_active},
    models::catalog::{CatalogEntry, CatalogKind},
};

// Categorias, marcas e formas de pagamento: mesmas colunas, tabelas diferentes.
// O nome da tabela sai de `CatalogKind::table()`.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, kind: CatalogKind, include_inactive: bool) -> Result<Vec<CatalogEntry>, AppError> {
        let sql = format!(
            "SELECT * FROM {} WHERE ($1 OR is_active) ORDER BY name ASC",
            kind.table()
        );
        let entries = sqlx::query_as::<_, CatalogEntry>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    pub async fn find<'e, E>(&self, executor: E, kind: CatalogKind, id: Uuid) -> Result<Option<CatalogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, kind.table(), id, false).await
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        kind: CatalogKind,
        name: &str,
        description: Option<&str>,
    ) -> Result<CatalogEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO {} (name, description) VALUES ($1, $2) RETURNING *",
            kind.table()
        );
        sqlx::query_as::<_, CatalogEntry>(&sql)
            .bind(name)
            .bind(description)
            .fetch_one(executor)
            .await
            .map_err(|e| AppError::from_unique(e, format!("{} '{}'", kind.label(), name)))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        kind: CatalogKind,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<CatalogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE {} SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
            kind.table()
        );
        sqlx::query_as::<_, CatalogEntry>(&sql)
            .bind(id)
            .bind(name)
            .bind(description)
            .fetch_optional(executor)
            .await
            .map_err(|e| AppError::from_unique(e, format!("{} '{}'", kind.label(), name.unwrap_or_default())))
    }

    pub async fn set_active<'e, E>(&self, executor: E, kind: CatalogKind, id: Uuid, active: bool) -> Result<Option<CatalogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        set_active(executor, kind.table(), id, active).await
    }

    pub async fn toggle<'e, E>(&self, executor: E, kind: CatalogKind, id: Uuid) -> Result<Option<CatalogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        toggle_active(executor, kind.table(), id).await
    }
}

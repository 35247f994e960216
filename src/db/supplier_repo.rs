// src/db/supplier_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, validation::DocumentType},
    db::{customer_repo::push_search, find_row, set_active, toggle_active},
    models::customer::{PartyFilter, Supplier, SupplierSummary},
};

pub const SUPPLIERS: &str = "suppliers";

#[derive(Clone)]
pub struct SupplierRepository {
    pool: PgPool,
}

impl SupplierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &PartyFilter) -> Result<Vec<SupplierSummary>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT s.*, p.name FROM suppliers s JOIN persons p ON p.id = s.person_id WHERE 1 = 1",
        );
        if !filter.include_inactive {
            qb.push(" AND s.is_active");
        }
        push_search(&mut qb, filter.search.as_deref(), "s");
        qb.push(" ORDER BY p.name ASC");

        let suppliers = qb.build_query_as::<SupplierSummary>().fetch_all(&self.pool).await?;
        Ok(suppliers)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, SUPPLIERS, id, false).await
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        person_id: Uuid,
        document: &str,
        document_type: DocumentType,
        trade_name: Option<&str>,
    ) -> Result<Supplier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (person_id, document, document_type, trade_name)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(person_id)
        .bind(document)
        .bind(document_type)
        .bind(trade_name)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("Fornecedor com {} {}", document_type.label(), document)))
    }

    /// `document` já vem normalizado; `None` mantém o valor atual.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        document: Option<(&str, DocumentType)>,
        trade_name: Option<&str>,
    ) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (doc, doc_type) = document.unzip();
        sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers SET
                document = COALESCE($2, document),
                document_type = COALESCE($3, document_type),
                trade_name = COALESCE($4, trade_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(doc)
        .bind(doc_type)
        .bind(trade_name)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("Fornecedor com documento {}", doc.unwrap_or_default())))
    }

    pub async fn set_active<'e, E>(&self, executor: E, id: Uuid, active: bool) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        set_active(executor, SUPPLIERS, id, active).await
    }

    pub async fn toggle<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        toggle_active(executor, SUPPLIERS, id).await
    }
}

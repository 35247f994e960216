// src/db/customer_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, validation::DocumentType},
    db::{find_row, set_active, toggle_active},
    models::customer::{Customer, CustomerSummary, PartyFilter},
};

pub const CUSTOMERS: &str = "customers";

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &PartyFilter) -> Result<Vec<CustomerSummary>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT c.*, p.name FROM customers c JOIN persons p ON p.id = c.person_id WHERE 1 = 1",
        );
        if !filter.include_inactive {
            qb.push(" AND c.is_active");
        }
        push_search(&mut qb, filter.search.as_deref(), "c");
        qb.push(" ORDER BY p.name ASC");

        let customers = qb.build_query_as::<CustomerSummary>().fetch_all(&self.pool).await?;
        Ok(customers)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, CUSTOMERS, id, false).await
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        person_id: Uuid,
        document: &str,
        document_type: DocumentType,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (person_id, document, document_type)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(person_id)
        .bind(document)
        .bind(document_type)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("Cliente com {} {}", document_type.label(), document)))
    }

    pub async fn update_document<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        document: &str,
        document_type: DocumentType,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET document = $2, document_type = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(document)
        .bind(document_type)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("Cliente com {} {}", document_type.label(), document)))
    }

    pub async fn set_active<'e, E>(&self, executor: E, id: Uuid, active: bool) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        set_active(executor, CUSTOMERS, id, active).await
    }

    pub async fn toggle<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        toggle_active(executor, CUSTOMERS, id).await
    }
}

/// Filtro de busca compartilhado por clientes e fornecedores:
/// texto com dígitos procura também no documento.
pub(crate) fn push_search(qb: &mut QueryBuilder<'_, Postgres>, search: Option<&str>, alias: &str) {
    let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) else {
        return;
    };
    qb.push(" AND (p.name ILIKE ").push_bind(format!("%{term}%"));

    let digits: String = term.chars().filter(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        qb.push(format!(" OR {alias}.document LIKE "))
            .push_bind(format!("%{digits}%"));
    }
    qb.push(")");
}

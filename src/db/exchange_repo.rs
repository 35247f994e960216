// src/db/exchange_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::find_row,
    models::exchange::{Exchange, ExchangeFilter, ExchangeStatus, NewExchange},
};

pub const EXCHANGES: &str = "exchanges";

#[derive(Clone)]
pub struct ExchangeRepository {
    pool: PgPool,
}

impl ExchangeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &ExchangeFilter) -> Result<Vec<Exchange>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM exchanges WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(sale_id) = filter.sale_id {
            qb.push(" AND sale_id = ").push_bind(sale_id);
        }
        qb.push(" ORDER BY created_at DESC");

        let exchanges = qb.build_query_as::<Exchange>().fetch_all(&self.pool).await?;
        Ok(exchanges)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Exchange>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, EXCHANGES, id, false).await
    }

    pub async fn lock<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Exchange>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, EXCHANGES, id, true).await
    }

    /// Quantidade da peça já devolvida em trocas pendentes ou aprovadas desta venda.
    pub async fn returned_quantity_in_use<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        part_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(returned_quantity), 0)::BIGINT FROM exchanges
            WHERE sale_id = $1 AND returned_part_id = $2
              AND status IN ('pendente', 'aprovada')
            "#,
        )
        .bind(sale_id)
        .bind(part_id)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }

    /// Trocas ainda em aberto (pendentes ou aprovadas) de uma venda.
    pub async fn count_open_for_sale<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM exchanges WHERE sale_id = $1 AND status IN ('pendente', 'aprovada')",
        )
        .bind(sale_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        input: &NewExchange,
        customer_id: Uuid,
        price_difference: Decimal,
        requested_by: Uuid,
    ) -> Result<Exchange, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exchange = sqlx::query_as::<_, Exchange>(
            r#"
            INSERT INTO exchanges (
                sale_id, customer_id, returned_part_id, returned_quantity,
                replacement_part_id, replacement_quantity, price_difference,
                reason, status, requested_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pendente', $9)
            RETURNING *
            "#,
        )
        .bind(input.sale_id)
        .bind(customer_id)
        .bind(input.returned_part_id)
        .bind(input.returned_quantity)
        .bind(input.replacement_part_id)
        .bind(input.replacement_quantity)
        .bind(price_difference)
        .bind(&input.reason)
        .bind(requested_by)
        .fetch_one(executor)
        .await?;
        Ok(exchange)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ExchangeStatus,
        decided_by: Uuid,
    ) -> Result<Exchange, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exchange = sqlx::query_as::<_, Exchange>(
            r#"
            UPDATE exchanges SET
                status = $2,
                decided_by = $3,
                decided_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(decided_by)
        .fetch_one(executor)
        .await?;
        Ok(exchange)
    }
}

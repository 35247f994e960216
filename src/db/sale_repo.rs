// src/db/sale_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::find_row,
    models::sale::{Sale, SaleFilter, SaleItem, SaleStatus},
};

pub const SALES: &str = "sales";

#[derive(Clone)]
pub struct SaleRepository {
    pool: PgPool,
}

impl SaleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list(&self, filter: &SaleFilter) -> Result<Vec<Sale>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM sales WHERE 1 = 1");

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND customer_id = ").push_bind(customer_id);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at <= ").push_bind(to);
        }
        qb.push(" ORDER BY created_at DESC");

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, SALES, id, false).await
    }

    /// `SELECT ... FOR UPDATE`: serializa finalizar/cancelar da mesma venda.
    pub async fn lock<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, SALES, id, true).await
    }

    pub async fn list_items<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE sale_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create_header<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        seller_id: Uuid,
        payment_method_id: Uuid,
        discount: Decimal,
        total_amount: Decimal,
        notes: Option<&str>,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (customer_id, seller_id, payment_method_id, discount, total_amount, status, notes)
            VALUES ($1, $2, $3, $4, $5, 'pendente', $6)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(seller_id)
        .bind(payment_method_id)
        .bind(discount)
        .bind(total_amount)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    pub async fn add_item<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        part_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
        discount: Decimal,
    ) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (sale_id, part_id, quantity, unit_price, discount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(part_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(discount)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    /// Troca o status e carimba a data correspondente.
    pub async fn update_status<'e, E>(&self, executor: E, id: Uuid, status: SaleStatus) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET
                status = $2,
                finalized_at = CASE WHEN $2 = 'concluida'::sale_status THEN NOW() ELSE finalized_at END,
                cancelled_at = CASE WHEN $2 = 'cancelada'::sale_status THEN NOW() ELSE cancelled_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }
}

// src/db/purchase_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::find_row,
    models::purchase::{Purchase, PurchaseFilter, PurchaseItem, PurchaseStatus},
};

pub const PURCHASES: &str = "purchases";

#[derive(Clone)]
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &PurchaseFilter) -> Result<Vec<Purchase>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM purchases WHERE 1 = 1");

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(supplier_id) = filter.supplier_id {
            qb.push(" AND supplier_id = ").push_bind(supplier_id);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at <= ").push_bind(to);
        }
        qb.push(" ORDER BY created_at DESC");

        let purchases = qb.build_query_as::<Purchase>().fetch_all(&self.pool).await?;
        Ok(purchases)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Purchase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, PURCHASES, id, false).await
    }

    pub async fn lock<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Purchase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, PURCHASES, id, true).await
    }

    pub async fn list_items<'e, E>(&self, executor: E, purchase_id: Uuid) -> Result<Vec<PurchaseItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT * FROM purchase_items WHERE purchase_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(purchase_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn create_header<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
        buyer_id: Uuid,
        total_amount: Decimal,
        notes: Option<&str>,
    ) -> Result<Purchase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (supplier_id, buyer_id, total_amount, status, notes)
            VALUES ($1, $2, $3, 'pendente', $4)
            RETURNING *
            "#,
        )
        .bind(supplier_id)
        .bind(buyer_id)
        .bind(total_amount)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(purchase)
    }

    pub async fn add_item<'e, E>(
        &self,
        executor: E,
        purchase_id: Uuid,
        part_id: Uuid,
        quantity: i32,
        unit_cost: Decimal,
    ) -> Result<PurchaseItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, PurchaseItem>(
            r#"
            INSERT INTO purchase_items (purchase_id, part_id, quantity, unit_cost)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(purchase_id)
        .bind(part_id)
        .bind(quantity)
        .bind(unit_cost)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    pub async fn update_status<'e, E>(&self, executor: E, id: Uuid, status: PurchaseStatus) -> Result<Purchase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            UPDATE purchases SET
                status = $2,
                received_at = CASE WHEN $2 = 'recebida'::purchase_status THEN NOW() ELSE received_at END,
                cancelled_at = CASE WHEN $2 = 'cancelada'::purchase_status THEN NOW() ELSE cancelled_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(purchase)
    }
}

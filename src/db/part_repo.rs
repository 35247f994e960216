// src/db/part_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{find_row, set_active, toggle_active},
    models::part::{Image, NewPart, Part, PartCondition, PartFilter, UpdatePart},
};

pub const PARTS: &str = "parts";

#[derive(Clone)]
pub struct PartRepository {
    pool: PgPool,
}

impl PartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leitura
    // ---

    pub async fn list(&self, filter: &PartFilter) -> Result<Vec<Part>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM parts WHERE 1 = 1");

        if !filter.include_inactive {
            qb.push(" AND is_active");
        }
        if let Some(category_id) = filter.category_id {
            qb.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(brand_id) = filter.brand_id {
            qb.push(" AND brand_id = ").push_bind(brand_id);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{search}%");
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR code ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY name ASC");

        let parts = qb.build_query_as::<Part>().fetch_all(&self.pool).await?;
        Ok(parts)
    }

    /// Peças ativas no ou abaixo do estoque mínimo, das mais críticas para as menos.
    pub async fn list_low_stock(&self, limit: i64) -> Result<Vec<Part>, AppError> {
        let parts = sqlx::query_as::<_, Part>(
            r#"
            SELECT * FROM parts
            WHERE is_active AND stock_quantity <= minimum_stock
            ORDER BY (stock_quantity - minimum_stock) ASC, name ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(parts)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Part>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, PARTS, id, false).await
    }

    /// Busca e bloqueia (FOR UPDATE) as peças informadas, sempre na ordem do id
    /// para que duas transações concorrentes travem as linhas na mesma sequência.
    pub async fn lock_many<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Part>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let parts = sqlx::query_as::<_, Part>(
            "SELECT * FROM parts WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(parts)
    }

    // ---
    // Escrita
    // ---

    pub async fn create<'e, E>(&self, executor: E, input: &NewPart) -> Result<Part, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Part>(
            r#"
            INSERT INTO parts (
                name, description, category_id, brand_id, sale_price, cost_price,
                stock_quantity, minimum_stock, condition, code, location
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.brand_id)
        .bind(input.sale_price)
        .bind(input.cost_price)
        .bind(input.stock_quantity)
        .bind(input.minimum_stock)
        .bind(input.condition.unwrap_or(PartCondition::Novo))
        .bind(input.code.as_deref())
        .bind(input.location.as_deref())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("Código de peça '{}'", input.code.as_deref().unwrap_or_default())))
    }

    pub async fn update<'e, E>(&self, executor: E, id: Uuid, input: &UpdatePart) -> Result<Option<Part>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Part>(
            r#"
            UPDATE parts SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category_id = COALESCE($4, category_id),
                brand_id = COALESCE($5, brand_id),
                sale_price = COALESCE($6, sale_price),
                cost_price = COALESCE($7, cost_price),
                minimum_stock = COALESCE($8, minimum_stock),
                condition = COALESCE($9, condition),
                code = COALESCE($10, code),
                location = COALESCE($11, location),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name.as_deref())
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.brand_id)
        .bind(input.sale_price)
        .bind(input.cost_price)
        .bind(input.minimum_stock)
        .bind(input.condition)
        .bind(input.code.as_deref())
        .bind(input.location.as_deref())
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("Código de peça '{}'", input.code.as_deref().unwrap_or_default())))
    }

    /// Soma `delta` ao estoque. O filtro `stock_quantity + delta >= 0` garante que
    /// o saldo nunca fica negativo mesmo que o chamador tenha errado a conta;
    /// nesse caso nenhuma linha volta e o serviço trata como estoque insuficiente.
    pub async fn apply_stock_delta<'e, E>(&self, executor: E, id: Uuid, delta: i32) -> Result<Option<Part>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let part = sqlx::query_as::<_, Part>(
            r#"
            UPDATE parts
            SET stock_quantity = stock_quantity + $2, updated_at = NOW()
            WHERE id = $1 AND stock_quantity + $2 >= 0
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;
        Ok(part)
    }

    pub async fn set_cost_price<'e, E>(&self, executor: E, id: Uuid, cost: Decimal) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE parts SET cost_price = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(cost)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_active<'e, E>(&self, executor: E, id: Uuid, active: bool) -> Result<Option<Part>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        set_active(executor, PARTS, id, active).await
    }

    pub async fn toggle<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Part>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        toggle_active(executor, PARTS, id).await
    }

    // ---
    // Imagens
    // ---

    pub async fn list_images(&self, part_id: Uuid) -> Result<Vec<Image>, AppError> {
        let images = sqlx::query_as::<_, Image>(
            r#"
            SELECT i.* FROM images i
            JOIN part_images pi ON pi.image_id = i.id
            WHERE pi.part_id = $1
            ORDER BY pi.position ASC, i.created_at ASC
            "#,
        )
        .bind(part_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    pub async fn create_image<'e, E>(&self, executor: E, url: &str, description: Option<&str>) -> Result<Image, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let image = sqlx::query_as::<_, Image>(
            "INSERT INTO images (url, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(url)
        .bind(description)
        .fetch_one(executor)
        .await?;
        Ok(image)
    }

    /// Liga a imagem à peça, na última posição.
    pub async fn link_image<'e, E>(&self, executor: E, part_id: Uuid, image_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO part_images (part_id, image_id, position)
            VALUES (
                $1, $2,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM part_images WHERE part_id = $1)
            )
            "#,
        )
        .bind(part_id)
        .bind(image_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Remove a imagem; o vínculo cai junto (ON DELETE CASCADE).
    /// Retorna `false` se a imagem não pertence à peça.
    pub async fn delete_image<'e, E>(&self, executor: E, part_id: Uuid, image_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM images
            WHERE id = $2
              AND EXISTS (SELECT 1 FROM part_images WHERE part_id = $1 AND image_id = $2)
            "#,
        )
        .bind(part_id)
        .bind(image_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

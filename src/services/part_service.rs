// src/services/part_service.rs

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, validation::is_valid_money},
    db::{part_repo::PARTS, AuditRepository, CatalogRepository, PartRepository},
    models::{
        audit::{Actor, AuditAction, AuditEntry},
        catalog::CatalogKind,
        part::{Image, NewImage, NewPart, Part, PartFilter, UpdatePart},
    },
    services::{active, found, status_entry},
};

fn ensure_money(value: Option<Decimal>, field: &str) -> Result<(), AppError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(AppError::BusinessRule(format!("O {field} não pode ser negativo."))),
        Some(v) if !is_valid_money(&v) => Err(AppError::BusinessRule(format!("O {field} excede o máximo permitido."))),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct PartService {
    part_repo: PartRepository,
    catalog_repo: CatalogRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl PartService {
    pub fn new(
        part_repo: PartRepository,
        catalog_repo: CatalogRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self { part_repo, catalog_repo, audit_repo, pool }
    }

    pub async fn list(&self, filter: &PartFilter) -> Result<Vec<Part>, AppError> {
        self.part_repo.list(filter).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Part, AppError> {
        found(self.part_repo.find(&self.pool, id).await?, "Peça")
    }

    /// Peças ativas no ou abaixo do estoque mínimo.
    pub async fn list_low_stock(&self, limit: i64) -> Result<Vec<Part>, AppError> {
        self.part_repo.list_low_stock(limit.max(1)).await
    }

    async fn check_references(
        &self,
        conn: &mut PgConnection,
        category_id: Option<Uuid>,
        brand_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(id) = category_id {
            let category = self.catalog_repo.find(&mut *conn, CatalogKind::Category, id).await?;
            active(category, CatalogKind::Category.label(), |c| c.is_active)?;
        }
        if let Some(id) = brand_id {
            let brand = self.catalog_repo.find(&mut *conn, CatalogKind::Brand, id).await?;
            active(brand, CatalogKind::Brand.label(), |b| b.is_active)?;
        }
        Ok(())
    }

    pub async fn create(&self, actor: &Actor, input: NewPart) -> Result<Part, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        self.check_references(&mut tx, input.category_id, input.brand_id).await?;
        let part = self.part_repo.create(&mut *tx, &input).await?;
        let entry = AuditEntry::new(AuditAction::Create, PARTS, part.id, format!("Peça '{}' cadastrada", part.name))
            .after(&part);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Peça '{}' cadastrada com estoque {}", part.name, part.stock_quantity);
        Ok(part)
    }

    /// O estoque não passa por aqui; ele só muda por venda, compra ou troca.
    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdatePart) -> Result<Part, AppError> {
        input.validate()?;
        ensure_money(input.sale_price, "preço de venda")?;
        ensure_money(input.cost_price, "preço de custo")?;

        let mut tx = self.pool.begin().await?;
        let before = found(self.part_repo.find(&mut *tx, id).await?, "Peça")?;
        self.check_references(&mut tx, input.category_id, input.brand_id).await?;
        let after = found(self.part_repo.update(&mut *tx, id, &input).await?, "Peça")?;
        let entry = AuditEntry::new(AuditAction::Update, PARTS, id, format!("Peça '{}' atualizada", after.name))
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<Part, AppError> {
        self.change_status(actor, id, Some(false), true).await
    }

    pub async fn set_status(&self, actor: &Actor, id: Uuid, active: bool) -> Result<Part, AppError> {
        self.change_status(actor, id, Some(active), false).await
    }

    pub async fn toggle_status(&self, actor: &Actor, id: Uuid) -> Result<Part, AppError> {
        self.change_status(actor, id, None, false).await
    }

    async fn change_status(&self, actor: &Actor, id: Uuid, target: Option<bool>, deleted: bool) -> Result<Part, AppError> {
        let mut tx = self.pool.begin().await?;
        let before = found(self.part_repo.find(&mut *tx, id).await?, "Peça")?;
        if target == Some(before.is_active) {
            return Ok(before);
        }
        let after = match target {
            Some(flag) => self.part_repo.set_active(&mut *tx, id, flag).await?,
            None => self.part_repo.toggle(&mut *tx, id).await?,
        };
        let after = found(after, "Peça")?;
        let entry = status_entry(PARTS, "Peça", id, after.is_active, deleted, &before, &after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }

    // ---
    // Imagens
    // ---

    pub async fn list_images(&self, part_id: Uuid) -> Result<Vec<Image>, AppError> {
        self.find(part_id).await?;
        self.part_repo.list_images(part_id).await
    }

    pub async fn add_image(&self, actor: &Actor, part_id: Uuid, input: NewImage) -> Result<Image, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let part = self.part_repo.find(&mut *tx, part_id).await?;
        active(part, "Peça", |p| p.is_active)?;
        let image = self
            .part_repo
            .create_image(&mut *tx, &input.url, input.description.as_deref())
            .await?;
        self.part_repo.link_image(&mut *tx, part_id, image.id).await?;
        let entry = AuditEntry::new(AuditAction::Update, PARTS, part_id, "Imagem adicionada à peça").after(&image);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(image)
    }

    pub async fn remove_image(&self, actor: &Actor, part_id: Uuid, image_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        if !self.part_repo.delete_image(&mut *tx, part_id, image_id).await? {
            return Err(AppError::NotFound("Imagem"));
        }
        let entry = AuditEntry::new(AuditAction::Update, PARTS, part_id, format!("Imagem {image_id} removida da peça"));
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_prices_are_rejected_on_update() {
        assert!(ensure_money(None, "preço").is_ok());
        assert!(ensure_money(Some(Decimal::ZERO), "preço").is_ok());
        let err = ensure_money(Some(Decimal::new(-1, 2)), "preço de venda").unwrap_err();
        assert_eq!(err.to_string(), "O preço de venda não pode ser negativo.");
        let err = ensure_money(Some(Decimal::new(1_000_000_000_000, 2)), "preço de custo").unwrap_err();
        assert_eq!(err.to_string(), "O preço de custo excede o máximo permitido.");
    }
}

// src/services/catalog_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{AuditRepository, CatalogRepository},
    models::{
        audit::{Actor, AuditAction, AuditEntry},
        catalog::{CatalogEntry, CatalogKind, NewCatalogEntry, UpdateCatalogEntry},
    },
    services::{found, status_entry},
};

/// Categorias, marcas e formas de pagamento: mesmas regras, tabelas diferentes.
#[derive(Clone)]
pub struct CatalogService {
    catalog_repo: CatalogRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(catalog_repo: CatalogRepository, audit_repo: AuditRepository, pool: PgPool) -> Self {
        Self { catalog_repo, audit_repo, pool }
    }

    pub async fn list(&self, kind: CatalogKind, include_inactive: bool) -> Result<Vec<CatalogEntry>, AppError> {
        self.catalog_repo.list(kind, include_inactive).await
    }

    pub async fn find(&self, kind: CatalogKind, id: Uuid) -> Result<CatalogEntry, AppError> {
        found(self.catalog_repo.find(&self.pool, kind, id).await?, kind.label())
    }

    pub async fn create(&self, actor: &Actor, kind: CatalogKind, input: NewCatalogEntry) -> Result<CatalogEntry, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let entry = self
            .catalog_repo
            .create(&mut *tx, kind, input.name.trim(), input.description.as_deref())
            .await?;
        let log = AuditEntry::new(
            AuditAction::Create,
            kind.table(),
            entry.id,
            format!("{} '{}' criada", kind.label(), entry.name),
        )
        .after(&entry);
        self.audit_repo.insert(&mut *tx, actor, &log).await?;
        tx.commit().await?;

        tracing::info!("{} '{}' criada", kind.label(), entry.name);
        Ok(entry)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        kind: CatalogKind,
        id: Uuid,
        input: UpdateCatalogEntry,
    ) -> Result<CatalogEntry, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let before = found(self.catalog_repo.find(&mut *tx, kind, id).await?, kind.label())?;
        let after = self
            .catalog_repo
            .update(&mut *tx, kind, id, input.name.as_deref().map(str::trim), input.description.as_deref())
            .await?;
        let after = found(after, kind.label())?;
        let log = AuditEntry::new(
            AuditAction::Update,
            kind.table(),
            id,
            format!("{} '{}' atualizada", kind.label(), after.name),
        )
        .before(&before)
        .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &log).await?;
        tx.commit().await?;
        Ok(after)
    }

    pub async fn delete(&self, actor: &Actor, kind: CatalogKind, id: Uuid) -> Result<CatalogEntry, AppError> {
        self.change_status(actor, kind, id, Some(false), true).await
    }

    pub async fn set_status(&self, actor: &Actor, kind: CatalogKind, id: Uuid, active: bool) -> Result<CatalogEntry, AppError> {
        self.change_status(actor, kind, id, Some(active), false).await
    }

    pub async fn toggle_status(&self, actor: &Actor, kind: CatalogKind, id: Uuid) -> Result<CatalogEntry, AppError> {
        self.change_status(actor, kind, id, None, false).await
    }

    async fn change_status(
        &self,
        actor: &Actor,
        kind: CatalogKind,
        id: Uuid,
        target: Option<bool>,
        deleted: bool,
    ) -> Result<CatalogEntry, AppError> {
        let mut tx = self.pool.begin().await?;
        let before = found(self.catalog_repo.find(&mut *tx, kind, id).await?, kind.label())?;
        if target == Some(before.is_active) {
            return Ok(before);
        }
        let after = match target {
            Some(flag) => self.catalog_repo.set_active(&mut *tx, kind, id, flag).await?,
            None => self.catalog_repo.toggle(&mut *tx, kind, id).await?,
        };
        let after = found(after, kind.label())?;
        let log = status_entry(kind.table(), kind.label(), id, after.is_active, deleted, &before, &after);
        self.audit_repo.insert(&mut *tx, actor, &log).await?;
        tx.commit().await?;
        Ok(after)
    }
}

// src/services/supplier_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        validation::{parse_document, DocumentType},
    },
    db::{supplier_repo::SUPPLIERS, AuditRepository, SupplierRepository},
    models::{
        audit::{Actor, AuditAction, AuditEntry},
        customer::{NewSupplier, PartyFilter, Supplier, SupplierSummary, UpdateSupplier},
    },
    services::{found, status_entry, PersonService},
};

const SUPPLIER_DOCUMENTS: &[DocumentType] = &[DocumentType::Cnpj, DocumentType::Cpf];

#[derive(Clone)]
pub struct SupplierService {
    supplier_repo: SupplierRepository,
    person_service: PersonService,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl SupplierService {
    pub fn new(
        supplier_repo: SupplierRepository,
        person_service: PersonService,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self { supplier_repo, person_service, audit_repo, pool }
    }

    pub async fn list(&self, filter: &PartyFilter) -> Result<Vec<SupplierSummary>, AppError> {
        self.supplier_repo.list(filter).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Supplier, AppError> {
        found(self.supplier_repo.find(&self.pool, id).await?, "Fornecedor")
    }

    pub async fn create(&self, actor: &Actor, input: NewSupplier) -> Result<Supplier, AppError> {
        input.validate()?;
        let (document, document_type) = parse_document(&input.document, SUPPLIER_DOCUMENTS)?;

        let mut tx = self.pool.begin().await?;
        let person_id = self.person_service.resolve_ref(&mut tx, actor, &input.person).await?;
        let supplier = self
            .supplier_repo
            .create(&mut *tx, person_id, &document, document_type, input.trade_name.as_deref())
            .await?;
        let entry = AuditEntry::new(
            AuditAction::Create,
            SUPPLIERS,
            supplier.id,
            format!("Fornecedor criado ({} {})", document_type.label(), document),
        )
        .after(&supplier);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Fornecedor {} criado", supplier.id);
        Ok(supplier)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateSupplier) -> Result<Supplier, AppError> {
        input.validate()?;
        let document = input
            .document
            .as_deref()
            .map(|raw| parse_document(raw, SUPPLIER_DOCUMENTS))
            .transpose()?;

        let mut tx = self.pool.begin().await?;
        let before = found(self.supplier_repo.find(&mut *tx, id).await?, "Fornecedor")?;
        let after = self
            .supplier_repo
            .update(
                &mut *tx,
                id,
                document.as_ref().map(|(doc, kind)| (doc.as_str(), *kind)),
                input.trade_name.as_deref(),
            )
            .await?;
        let after = found(after, "Fornecedor")?;
        let entry = AuditEntry::new(AuditAction::Update, SUPPLIERS, id, "Fornecedor atualizado")
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<Supplier, AppError> {
        self.change_status(actor, id, Some(false), true).await
    }

    pub async fn set_status(&self, actor: &Actor, id: Uuid, active: bool) -> Result<Supplier, AppError> {
        self.change_status(actor, id, Some(active), false).await
    }

    pub async fn toggle_status(&self, actor: &Actor, id: Uuid) -> Result<Supplier, AppError> {
        self.change_status(actor, id, None, false).await
    }

    async fn change_status(&self, actor: &Actor, id: Uuid, target: Option<bool>, deleted: bool) -> Result<Supplier, AppError> {
        let mut tx = self.pool.begin().await?;
        let before = found(self.supplier_repo.find(&mut *tx, id).await?, "Fornecedor")?;
        if target == Some(before.is_active) {
            return Ok(before);
        }
        let after = match target {
            Some(flag) => self.supplier_repo.set_active(&mut *tx, id, flag).await?,
            None => self.supplier_repo.toggle(&mut *tx, id).await?,
        };
        let after = found(after, "Fornecedor")?;
        let entry = status_entry(SUPPLIERS, "Fornecedor", id, after.is_active, deleted, &before, &after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }
}

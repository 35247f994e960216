// src/services/customer_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        validation::{parse_document, DocumentType},
    },
    db::{customer_repo::CUSTOMERS, AuditRepository, CustomerRepository},
    models::{
        audit::{Actor, AuditAction, AuditEntry},
        customer::{Customer, CustomerSummary, NewCustomer, PartyFilter, UpdateCustomer},
    },
    services::{found, status_entry, PersonService},
};

/// Cliente pode ser pessoa física ou jurídica.
const CUSTOMER_DOCUMENTS: &[DocumentType] = &[DocumentType::Cpf, DocumentType::Cnpj];

#[derive(Clone)]
pub struct CustomerService {
    customer_repo: CustomerRepository,
    person_service: PersonService,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl CustomerService {
    pub fn new(
        customer_repo: CustomerRepository,
        person_service: PersonService,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self { customer_repo, person_service, audit_repo, pool }
    }

    pub async fn list(&self, filter: &PartyFilter) -> Result<Vec<CustomerSummary>, AppError> {
        self.customer_repo.list(filter).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Customer, AppError> {
        found(self.customer_repo.find(&self.pool, id).await?, "Cliente")
    }

    pub async fn create(&self, actor: &Actor, input: NewCustomer) -> Result<Customer, AppError> {
        input.validate()?;
        let (document, document_type) = parse_document(&input.document, CUSTOMER_DOCUMENTS)?;

        let mut tx = self.pool.begin().await?;
        let person_id = self.person_service.resolve_ref(&mut tx, actor, &input.person).await?;
        let customer = self
            .customer_repo
            .create(&mut *tx, person_id, &document, document_type)
            .await?;
        let entry = AuditEntry::new(
            AuditAction::Create,
            CUSTOMERS,
            customer.id,
            format!("Cliente criado ({} {})", document_type.label(), document),
        )
        .after(&customer);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Cliente {} criado", customer.id);
        Ok(customer)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateCustomer) -> Result<Customer, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let before = found(self.customer_repo.find(&mut *tx, id).await?, "Cliente")?;
        let Some(raw) = input.document.as_deref() else {
            return Ok(before);
        };
        let (document, document_type) = parse_document(raw, CUSTOMER_DOCUMENTS)?;
        let after = self
            .customer_repo
            .update_document(&mut *tx, id, &document, document_type)
            .await?;
        let after = found(after, "Cliente")?;
        let entry = AuditEntry::new(AuditAction::Update, CUSTOMERS, id, "Documento do cliente atualizado")
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<Customer, AppError> {
        self.change_status(actor, id, Some(false), true).await
    }

    pub async fn set_status(&self, actor: &Actor, id: Uuid, active: bool) -> Result<Customer, AppError> {
        self.change_status(actor, id, Some(active), false).await
    }

    pub async fn toggle_status(&self, actor: &Actor, id: Uuid) -> Result<Customer, AppError> {
        self.change_status(actor, id, None, false).await
    }

    async fn change_status(&self, actor: &Actor, id: Uuid, target: Option<bool>, deleted: bool) -> Result<Customer, AppError> {
        let mut tx = self.pool.begin().await?;
        let before = found(self.customer_repo.find(&mut *tx, id).await?, "Cliente")?;
        if target == Some(before.is_active) {
            return Ok(before);
        }
        let after = match target {
            Some(flag) => self.customer_repo.set_active(&mut *tx, id, flag).await?,
            None => self.customer_repo.toggle(&mut *tx, id).await?,
        };
        let after = found(after, "Cliente")?;
        let entry = status_entry(CUSTOMERS, "Cliente", id, after.is_active, deleted, &before, &after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }
}

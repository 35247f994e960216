// src/services/audit_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AuditRepository,
    models::audit::{AuditFilter, AuditLog},
};

/// Consulta da trilha de auditoria. A gravação acontece em cada serviço,
/// dentro da transação da própria operação.
#[derive(Clone)]
pub struct AuditService {
    audit_repo: AuditRepository,
}

impl AuditService {
    pub fn new(audit_repo: AuditRepository) -> Self {
        Self { audit_repo }
    }

    pub async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>, AppError> {
        self.audit_repo.list(filter).await
    }

    pub async fn find(&self, id: Uuid) -> Result<AuditLog, AppError> {
        self.audit_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Registro de log"))
    }
}

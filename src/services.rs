pub mod audit_service;
pub use audit_service::AuditService;
pub mod person_service;
pub use person_service::PersonService;
pub mod catalog_service;
pub use catalog_service::CatalogService;
pub mod part_service;
pub use part_service::PartService;
pub mod customer_service;
pub use customer_service::CustomerService;
pub mod supplier_service;
pub use supplier_service::SupplierService;
pub mod user_service;
pub use user_service::UserService;
pub mod sale_service;
pub use sale_service::SaleService;
pub mod purchase_service;
pub use purchase_service::PurchaseService;
pub mod exchange_service;
pub use exchange_service::ExchangeService;
pub mod stock;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::audit::{AuditAction, AuditEntry},
};

// ---
// Helpers compartilhados pelos serviços
// ---

/// `None` vira `NotFound(entity)`.
pub(crate) fn found<T>(row: Option<T>, entity: &'static str) -> Result<T, AppError> {
    row.ok_or(AppError::NotFound(entity))
}

/// Referência obrigatória: precisa existir e estar ativa.
pub(crate) fn active<T>(
    row: Option<T>,
    entity: &'static str,
    is_active: impl FnOnce(&T) -> bool,
) -> Result<T, AppError> {
    let row = found(row, entity)?;
    if !is_active(&row) {
        return Err(AppError::Inactive(entity));
    }
    Ok(row)
}

/// Registro de auditoria de uma troca de `is_active` (inclui o soft delete).
pub(crate) fn status_entry<T: Serialize>(
    table: &'static str,
    label: &str,
    id: Uuid,
    active: bool,
    deleted: bool,
    before: &T,
    after: &T,
) -> AuditEntry {
    let (action, details) = if deleted {
        (AuditAction::Delete, format!("{label} desativado(a)"))
    } else {
        let word = if active { "ativado(a)" } else { "desativado(a)" };
        (AuditAction::StatusChange, format!("{label} {word}"))
    };
    AuditEntry::new(action, table, id, details).before(before).after(after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        is_active: bool,
    }

    #[test]
    fn active_reference_checks_existence_then_flag() {
        assert!(matches!(found::<Row>(None, "Peça"), Err(AppError::NotFound("Peça"))));
        let inactive = active(Some(Row { is_active: false }), "Marca", |r| r.is_active);
        assert!(matches!(inactive, Err(AppError::Inactive("Marca"))));
        assert!(active(Some(Row { is_active: true }), "Marca", |r| r.is_active).is_ok());
    }

    #[test]
    fn delete_is_audited_as_delete() {
        let id = Uuid::new_v4();
        let entry = status_entry("parts", "Peça", id, false, true, &Row { is_active: true }, &Row { is_active: false });
        assert_eq!(entry.action, AuditAction::Delete);
        let entry = status_entry("parts", "Peça", id, true, false, &Row { is_active: false }, &Row { is_active: true });
        assert_eq!(entry.action, AuditAction::StatusChange);
        assert_eq!(entry.details, "Peça ativado(a)");
    }
}

// src/models/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Tabelas auxiliares que compartilham o mesmo formato (nome, descrição, status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogKind {
    Category,
    Brand,
    PaymentMethod,
}

impl CatalogKind {
    pub fn table(self) -> &'static str {
        match self {
            CatalogKind::Category => "categories",
            CatalogKind::Brand => "brands",
            CatalogKind::PaymentMethod => "payment_methods",
        }
    }

    /// Nome usado nas mensagens de erro e na auditoria.
    pub fn label(self) -> &'static str {
        match self {
            CatalogKind::Category => "Categoria",
            CatalogKind::Brand => "Marca",
            CatalogKind::PaymentMethod => "Forma de pagamento",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewCatalogEntry {
    #[validate(length(min = 1, max = 100, message = "O nome é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCatalogEntry {
    #[validate(length(min = 1, max = 100, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_its_own_table() {
        let kinds = [CatalogKind::Category, CatalogKind::Brand, CatalogKind::PaymentMethod];
        let tables: Vec<_> = kinds.iter().map(|k| k.table()).collect();
        assert_eq!(tables, ["categories", "brands", "payment_methods"]);
    }
}

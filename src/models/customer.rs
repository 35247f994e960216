// src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::{common::validation::DocumentType, models::person::PersonRef};

// --- Cliente ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub person_id: Uuid,
    pub document: String,
    pub document_type: DocumentType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cliente com o nome da pessoa, para listagens.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub customer: Customer,
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    #[validate(nested)]
    #[serde(flatten)]
    pub person: PersonRef,
    #[validate(length(min = 11, max = 18, message = "Informe um CPF ou CNPJ."))]
    pub document: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomer {
    #[validate(length(min = 11, max = 18, message = "Informe um CPF ou CNPJ."))]
    pub document: Option<String>,
}

// --- Fornecedor ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub person_id: Uuid,
    pub document: String,
    pub document_type: DocumentType,
    pub trade_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub supplier: Supplier,
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    #[validate(nested)]
    #[serde(flatten)]
    pub person: PersonRef,
    #[validate(length(min = 11, max = 18, message = "Informe um CNPJ ou CPF."))]
    pub document: String,
    #[validate(length(max = 150))]
    pub trade_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplier {
    #[validate(length(min = 11, max = 18, message = "Informe um CNPJ ou CPF."))]
    pub document: Option<String>,
    #[validate(length(max = 150))]
    pub trade_name: Option<String>,
}

/// Filtro das listagens de clientes e fornecedores.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyFilter {
    #[serde(default)]
    pub include_inactive: bool,
    /// Busca por nome (ILIKE) ou documento (só dígitos).
    pub search: Option<String>,
}

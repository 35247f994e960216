// src/models/part.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "part_condition", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PartCondition {
    Novo,
    Usado,
    Recondicionado,
}

// --- Peça ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub sale_price: Decimal,
    pub cost_price: Decimal,
    pub stock_quantity: i32,
    pub minimum_stock: i32,
    pub condition: PartCondition,
    pub code: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Part {
    pub fn is_below_minimum(&self) -> bool {
        self.stock_quantity <= self.minimum_stock
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Uuid,
    pub url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPart {
    #[validate(length(min = 1, max = 150, message = "O nome é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,

    #[validate(custom(function = "validate_money"))]
    pub sale_price: Decimal,

    #[validate(custom(function = "validate_money"))]
    #[serde(default)]
    pub cost_price: Decimal,

    #[validate(range(min = 0, message = "O estoque não pode ser negativo."))]
    #[serde(default)]
    pub stock_quantity: i32,

    #[validate(range(min = 0, message = "O estoque mínimo não pode ser negativo."))]
    #[serde(default)]
    pub minimum_stock: i32,

    pub condition: Option<PartCondition>,

    #[validate(length(min = 1, max = 50, message = "Código inválido."))]
    pub code: Option<String>,

    #[validate(length(max = 100))]
    pub location: Option<String>,
}

/// Atualização parcial. O estoque não é alterado aqui: ele só muda por
/// venda, compra ou troca.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePart {
    #[validate(length(min = 1, max = 150, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub sale_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    #[validate(range(min = 0, message = "O estoque mínimo não pode ser negativo."))]
    pub minimum_stock: Option<i32>,
    pub condition: Option<PartCondition>,
    #[validate(length(min = 1, max = 50, message = "Código inválido."))]
    pub code: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartFilter {
    #[serde(default)]
    pub include_inactive: bool,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    /// Busca por nome ou código.
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewImage {
    #[validate(url(message = "URL da imagem inválida."))]
    pub url: String,
    pub description: Option<String>,
}

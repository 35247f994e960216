// src/models/purchase.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::{status::StatusMachine, validation::validate_money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "purchase_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pendente,
    Recebida,
    Cancelada,
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PurchaseStatus::Pendente => "pendente",
            PurchaseStatus::Recebida => "recebida",
            PurchaseStatus::Cancelada => "cancelada",
        })
    }
}

impl StatusMachine for PurchaseStatus {
    const ENTITY: &'static str = "Compra";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            PurchaseStatus::Pendente => &[PurchaseStatus::Recebida, PurchaseStatus::Cancelada],
            PurchaseStatus::Recebida => &[PurchaseStatus::Cancelada],
            PurchaseStatus::Cancelada => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub buyer_id: Uuid,
    pub total_amount: Decimal,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub part_id: Uuid,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDetail {
    #[serde(flatten)]
    pub header: Purchase,
    pub items: Vec<PurchaseItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchaseItem {
    pub part_id: Uuid,
    #[validate(range(min = 1, max = 100_000, message = "A quantidade deve estar entre 1 e 100000."))]
    pub quantity: i32,
    #[validate(custom(function = "validate_money"))]
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPurchase {
    pub supplier_id: Uuid,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "A compra precisa de pelo menos um item."), nested)]
    pub items: Vec<NewPurchaseItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseFilter {
    pub status: Option<PurchaseStatus>,
    pub supplier_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_purchase_can_only_be_cancelled() {
        assert_eq!(PurchaseStatus::Recebida.allowed_next(), &[PurchaseStatus::Cancelada]);
        assert!(PurchaseStatus::Recebida.ensure_transition(PurchaseStatus::Recebida).is_err());
        assert!(PurchaseStatus::Cancelada.ensure_transition(PurchaseStatus::Recebida).is_err());
    }

    #[test]
    fn purchase_items_are_validated() {
        let item = |quantity, unit_cost| NewPurchaseItem { part_id: Uuid::new_v4(), quantity, unit_cost };
        let purchase = |items| NewPurchase { supplier_id: Uuid::new_v4(), notes: None, items };

        assert!(purchase(vec![item(10, Decimal::new(1250, 2))]).validate().is_ok());
        assert!(purchase(vec![]).validate().is_err());
        assert!(purchase(vec![item(i32::MAX, Decimal::ONE)]).validate().is_err());
        assert!(purchase(vec![item(1, Decimal::new(7, 0) * Decimal::new(10_i64.pow(18), 0))]).validate().is_err());
    }
}

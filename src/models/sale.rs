// src/models/sale.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::{status::StatusMachine, validation::validate_money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pendente,
    Concluida,
    Cancelada,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaleStatus::Pendente => "pendente",
            SaleStatus::Concluida => "concluida",
            SaleStatus::Cancelada => "cancelada",
        })
    }
}

impl StatusMachine for SaleStatus {
    const ENTITY: &'static str = "Venda";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            SaleStatus::Pendente => &[SaleStatus::Concluida, SaleStatus::Cancelada],
            SaleStatus::Concluida => &[SaleStatus::Cancelada],
            SaleStatus::Cancelada => &[],
        }
    }
}

// --- Cabeçalho da venda ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub seller_id: Uuid,
    pub payment_method_id: Uuid,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub status: SaleStatus,
    pub notes: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub part_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub header: Sale,
    pub items: Vec<SaleItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleItem {
    pub part_id: Uuid,

    #[validate(range(min = 1, max = 100_000, message = "A quantidade deve estar entre 1 e 100000."))]
    pub quantity: i32,

    /// Quando ausente, usa o preço de venda atual da peça.
    pub unit_price: Option<Decimal>,

    #[validate(custom(function = "validate_money"))]
    #[serde(default)]
    pub discount: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub customer_id: Uuid,
    pub payment_method_id: Uuid,

    #[validate(custom(function = "validate_money"))]
    #[serde(default)]
    pub discount: Decimal,

    pub notes: Option<String>,

    #[validate(length(min = 1, message = "A venda precisa de pelo menos um item."), nested)]
    pub items: Vec<NewSaleItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub customer_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_sale_can_be_finalized_or_cancelled() {
        assert!(SaleStatus::Pendente.can_transition_to(SaleStatus::Concluida));
        assert!(SaleStatus::Pendente.can_transition_to(SaleStatus::Cancelada));
        assert!(SaleStatus::Concluida.can_transition_to(SaleStatus::Cancelada));
    }

    #[test]
    fn completed_and_cancelled_sales_cannot_be_finalized_again() {
        let err = SaleStatus::Concluida.ensure_transition(SaleStatus::Concluida).unwrap_err();
        assert_eq!(err.to_string(), "Transição de status inválida para Venda: concluida -> concluida");
        assert!(SaleStatus::Cancelada.ensure_transition(SaleStatus::Concluida).is_err());
        assert!(SaleStatus::Cancelada.ensure_transition(SaleStatus::Cancelada).is_err());
    }

    fn item(quantity: i32, discount: Decimal) -> NewSaleItem {
        NewSaleItem { part_id: Uuid::new_v4(), quantity, unit_price: None, discount }
    }

    #[test]
    fn item_quantity_and_discount_are_bounded() {
        assert!(item(1, Decimal::ZERO).validate().is_ok());
        assert!(item(100_000, Decimal::ZERO).validate().is_ok());
        assert!(item(0, Decimal::ZERO).validate().is_err());
        assert!(item(i32::MAX, Decimal::ZERO).validate().is_err());
        assert!(item(1, Decimal::new(1_000_000_000_000, 2)).validate().is_err());
    }

    #[test]
    fn sale_needs_items_and_validates_each_one() {
        let mut sale = NewSale {
            customer_id: Uuid::new_v4(),
            payment_method_id: Uuid::new_v4(),
            discount: Decimal::ZERO,
            notes: None,
            items: vec![],
        };
        assert!(sale.validate().is_err());
        sale.items.push(item(2, Decimal::ZERO));
        assert!(sale.validate().is_ok());
        sale.items.push(item(i32::MAX, Decimal::ZERO));
        assert!(sale.validate().is_err());
    }

    #[test]
    fn status_uses_portuguese_wire_names() {
        assert_eq!(serde_json::to_string(&SaleStatus::Concluida).unwrap(), "\"concluida\"");
        let parsed: SaleStatus = serde_json::from_str("\"pendente\"").unwrap();
        assert_eq!(parsed, SaleStatus::Pendente);
    }
}

// src/models/exchange.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::status::StatusMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "exchange_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Pendente,
    Aprovada,
    Rejeitada,
    Cancelada,
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExchangeStatus::Pendente => "pendente",
            ExchangeStatus::Aprovada => "aprovada",
            ExchangeStatus::Rejeitada => "rejeitada",
            ExchangeStatus::Cancelada => "cancelada",
        })
    }
}

impl StatusMachine for ExchangeStatus {
    const ENTITY: &'static str = "Troca";

    fn allowed_next(self) -> &'static [Self] {
        match self {
            ExchangeStatus::Pendente => &[
                ExchangeStatus::Aprovada,
                ExchangeStatus::Rejeitada,
                ExchangeStatus::Cancelada,
            ],
            ExchangeStatus::Aprovada => &[ExchangeStatus::Cancelada],
            ExchangeStatus::Rejeitada | ExchangeStatus::Cancelada => &[],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub customer_id: Uuid,
    pub returned_part_id: Uuid,
    pub returned_quantity: i32,
    pub replacement_part_id: Uuid,
    pub replacement_quantity: i32,
    /// Positivo: o cliente paga a diferença. Negativo: a loja devolve.
    pub price_difference: Decimal,
    pub reason: String,
    pub status: ExchangeStatus,
    pub requested_by: Uuid,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewExchange {
    pub sale_id: Uuid,
    pub returned_part_id: Uuid,
    #[validate(range(min = 1, max = 100_000, message = "A quantidade devolvida deve estar entre 1 e 100000."))]
    pub returned_quantity: i32,
    pub replacement_part_id: Uuid,
    #[validate(range(min = 1, max = 100_000, message = "A quantidade trocada deve estar entre 1 e 100000."))]
    pub replacement_quantity: i32,
    #[validate(length(min = 1, message = "Informe o motivo da troca."))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeFilter {
    pub status: Option<ExchangeStatus>,
    pub sale_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_exchanges_can_be_decided() {
        assert!(ExchangeStatus::Pendente.can_transition_to(ExchangeStatus::Aprovada));
        assert!(ExchangeStatus::Pendente.can_transition_to(ExchangeStatus::Rejeitada));
        assert!(ExchangeStatus::Aprovada.ensure_transition(ExchangeStatus::Aprovada).is_err());
        assert!(ExchangeStatus::Rejeitada.ensure_transition(ExchangeStatus::Aprovada).is_err());
        assert!(ExchangeStatus::Aprovada.can_transition_to(ExchangeStatus::Cancelada));
    }

    #[test]
    fn exchange_quantities_are_bounded() {
        let mut input = NewExchange {
            sale_id: Uuid::new_v4(),
            returned_part_id: Uuid::new_v4(),
            returned_quantity: 1,
            replacement_part_id: Uuid::new_v4(),
            replacement_quantity: 1,
            reason: "defeito".into(),
        };
        assert!(input.validate().is_ok());
        input.replacement_quantity = i32::MAX;
        assert!(input.validate().is_err());
    }
}

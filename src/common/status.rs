// src/common/status.rs

use std::fmt::Display;

use crate::common::error::AppError;

/// Máquina de estados de um cabeçalho (venda, compra, troca).
/// Cada status declara para onde pode ir; todas as transições passam por `ensure_transition`.
pub trait StatusMachine: Copy + PartialEq + Display + 'static {
    /// Nome da entidade usado nas mensagens de erro.
    const ENTITY: &'static str;

    fn allowed_next(self) -> &'static [Self];

    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    fn ensure_transition(self, next: Self) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::InvalidStatusTransition {
                entity: Self::ENTITY,
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

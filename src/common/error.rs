// src/common/error.rs

use thiserror::Error;

/// Classificação grossa de um erro, usada por quem expõe os serviços
/// (ex: uma camada HTTP que precisa escolher 400/404/409/403/500).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    Forbidden,
    Internal,
}

// Nosso tipo de erro, com `thiserror` para as mensagens em português.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0} não encontrado(a)")]
    NotFound(&'static str),

    #[error("{0} está inativo(a)")]
    Inactive(&'static str),

    #[error("Estoque insuficiente para a peça '{part}': disponível {available}, solicitado {requested}")]
    InsufficientStock {
        part: String,
        available: i32,
        requested: i32,
    },

    #[error("Transição de status inválida para {entity}: {from} -> {to}")]
    InvalidStatusTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("O valor total não pode ser negativo")]
    NegativeTotal,

    #[error("{0} inválido")]
    InvalidDocument(&'static str),

    #[error("{0} já cadastrado(a)")]
    AlreadyExists(String),

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("{0}")]
    BusinessRule(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro ao executar migrações: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ValidationError(_)
            | AppError::Inactive(_)
            | AppError::InsufficientStock { .. }
            | AppError::InvalidStatusTransition { .. }
            | AppError::NegativeTotal
            | AppError::InvalidDocument(_)
            | AppError::BusinessRule(_) => ErrorKind::BadRequest,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::AlreadyExists(_) => ErrorKind::Conflict,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::DatabaseError(sqlx::Error::RowNotFound) => ErrorKind::NotFound,
            AppError::DatabaseError(_)
            | AppError::MigrationError(_)
            | AppError::InternalServerError(_) => ErrorKind::Internal,
        }
    }

    /// Converte violação de UNIQUE do Postgres em `AlreadyExists`; o resto vira `DatabaseError`.
    pub(crate) fn from_unique(e: sqlx::Error, what: impl Into<String>) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::AlreadyExists(what.into());
            }
        }
        e.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_are_client_errors() {
        assert_eq!(AppError::NegativeTotal.kind(), ErrorKind::BadRequest);
        assert_eq!(
            AppError::InsufficientStock { part: "Filtro".into(), available: 1, requested: 2 }.kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(AppError::NotFound("Peça").kind(), ErrorKind::NotFound);
        assert_eq!(AppError::AlreadyExists("E-mail".into()).kind(), ErrorKind::Conflict);
        assert_eq!(AppError::Forbidden("apenas admin".into()).kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert_eq!(AppError::DatabaseError(sqlx::Error::RowNotFound).kind(), ErrorKind::NotFound);
        assert_eq!(AppError::DatabaseError(sqlx::Error::PoolTimedOut).kind(), ErrorKind::Internal);
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(AppError::NotFound("Peça").to_string(), "Peça não encontrado(a)");
        let err = AppError::InsufficientStock { part: "Vela".into(), available: 2, requested: 5 };
        assert_eq!(
            err.to_string(),
            "Estoque insuficiente para a peça 'Vela': disponível 2, solicitado 5"
        );
    }
}

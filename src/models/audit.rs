// src/models/audit.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::UserRole;

/// Quem está executando a operação. Todo serviço que escreve recebe um `Actor`
/// para gravar a trilha de auditoria na mesma transação.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
    pub ip: Option<String>,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role, ip: None }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    StatusChange,
    Finalize,
    Cancel,
    Receive,
    Approve,
    Reject,
}

// Linha da tabela 'system_logs'
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub details: String,
    pub table_name: String,
    pub record_id: Option<Uuid>,
    pub before_data: Option<Value>,
    pub after_data: Option<Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Registro a ser gravado. Os snapshots são opcionais (ex: criação não tem "antes").
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub table_name: &'static str,
    pub record_id: Option<Uuid>,
    pub details: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, table_name: &'static str, record_id: Uuid, details: impl Into<String>) -> Self {
        Self {
            action,
            table_name,
            record_id: Some(record_id),
            details: details.into(),
            before: None,
            after: None,
        }
    }

    pub fn before<T: Serialize>(mut self, value: &T) -> Self {
        self.before = self.snapshot(value, "antes");
        self
    }

    pub fn after<T: Serialize>(mut self, value: &T) -> Self {
        self.after = self.snapshot(value, "depois");
        self
    }

    // O log não bloqueia a operação: sem snapshot, grava NULL e avisa.
    fn snapshot<T: Serialize>(&self, value: &T, side: &str) -> Option<Value> {
        match serde_json::to_value(value) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::warn!(
                    "Snapshot '{}' de {} ({:?}) não pôde ser serializado: {}",
                    side,
                    self.table_name,
                    self.record_id,
                    e
                );
                None
            }
        }
    }
}

pub const DEFAULT_LOG_LIMIT: i64 = 50;
pub const MAX_LOG_LIMIT: i64 = 200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub table_name: Option<String>,
    pub record_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditFilter {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        let mut filter = AuditFilter::default();
        assert_eq!(filter.effective_limit(), DEFAULT_LOG_LIMIT);
        filter.limit = Some(0);
        assert_eq!(filter.effective_limit(), 1);
        filter.limit = Some(10_000);
        assert_eq!(filter.effective_limit(), MAX_LOG_LIMIT);
        filter.offset = Some(-5);
        assert_eq!(filter.effective_offset(), 0);
    }

    #[test]
    fn entry_keeps_json_snapshots() {
        let id = Uuid::new_v4();
        let entry = AuditEntry::new(AuditAction::Update, "parts", id, "Peça atualizada")
            .before(&serde_json::json!({ "stockQuantity": 3 }))
            .after(&serde_json::json!({ "stockQuantity": 1 }));
        assert_eq!(entry.record_id, Some(id));
        assert_eq!(entry.before.unwrap()["stockQuantity"], 3);
        assert_eq!(entry.after.unwrap()["stockQuantity"], 1);
    }

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("sem representação"))
        }
    }

    #[test]
    fn unserializable_snapshot_is_stored_as_null() {
        let entry = AuditEntry::new(AuditAction::Update, "parts", Uuid::new_v4(), "Peça atualizada")
            .before(&Broken)
            .after(&serde_json::json!({ "ok": true }));
        assert!(entry.before.is_none());
        assert!(entry.after.is_some());
    }
}

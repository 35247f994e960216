// src/db/audit_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::audit::{Actor, AuditEntry, AuditFilter, AuditLog},
};

// Repositório da trilha de auditoria ('system_logs')
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grava um registro de auditoria. Chamado dentro da transação da operação auditada.
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        actor: &Actor,
        entry: &AuditEntry,
    ) -> Result<AuditLog, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let log = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO system_logs (
                user_id, action, details, table_name, record_id,
                before_data, after_data, ip_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(actor.user_id)
        .bind(entry.action)
        .bind(&entry.details)
        .bind(entry.table_name)
        .bind(entry.record_id)
        .bind(&entry.before)
        .bind(&entry.after)
        .bind(actor.ip.as_deref())
        .fetch_one(executor)
        .await?;

        Ok(log)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditLog>, AppError> {
        let log = sqlx::query_as::<_, AuditLog>("SELECT * FROM system_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(log)
    }

    /// Lista com filtros opcionais, mais recentes primeiro.
    pub async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditLog>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM system_logs WHERE 1 = 1");

        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(action) = filter.action {
            qb.push(" AND action = ").push_bind(action);
        }
        if let Some(table_name) = &filter.table_name {
            qb.push(" AND table_name = ").push_bind(table_name.clone());
        }
        if let Some(record_id) = filter.record_id {
            qb.push(" AND record_id = ").push_bind(record_id);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at <= ").push_bind(to);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.effective_limit())
            .push(" OFFSET ")
            .push_bind(filter.effective_offset());

        let logs = qb.build_query_as::<AuditLog>().fetch_all(&self.pool).await?;
        Ok(logs)
    }
}

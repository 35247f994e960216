// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{find_row, set_active, toggle_active},
    models::user::{User, UserRole},
};

pub const USERS: &str = "users";

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE ($1 OR is_active) ORDER BY email ASC",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    // Busca um usuário pelo seu e-mail (sempre gravado em minúsculas)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, USERS, id, false).await
    }

    // Cria um novo usuário no banco de dados
    pub async fn create<'e, E>(
        &self,
        executor: E,
        person_id: Uuid,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (person_id, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(person_id)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(executor)
        .await
        // Converte erro de violação de chave única em um erro mais amigável
        .map_err(|e| AppError::from_unique(e, format!("E-mail '{email}'")))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        email: Option<&str>,
        password_hash: Option<&str>,
        role: Option<UserRole>,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                role = COALESCE($4, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("E-mail '{}'", email.unwrap_or_default())))
    }

    /// Bloqueia os administradores ativos (ordem do id) e devolve seus ids.
    /// Duas remoções concorrentes de admins ficam serializadas aqui.
    pub async fn lock_active_admins<'e, E>(&self, executor: E) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE role = 'admin' AND is_active ORDER BY id FOR UPDATE",
        )
        .fetch_all(executor)
        .await?;
        Ok(ids)
    }

    pub async fn set_active<'e, E>(&self, executor: E, id: Uuid, active: bool) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        set_active(executor, USERS, id, active).await
    }

    pub async fn toggle<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        toggle_active(executor, USERS, id).await
    }
}

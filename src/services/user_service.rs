// src/services/user_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{user_repo::USERS, AuditRepository, UserRepository},
    models::{
        audit::{Actor, AuditAction, AuditEntry},
        user::{NewUser, UpdateUser, User, UserRole},
    },
    services::{found, status_entry, PersonService},
};

fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if !actor.is_admin() {
        tracing::warn!("Usuário {} tentou gerenciar usuários sem ser admin", actor.user_id);
        return Err(AppError::Forbidden("apenas administradores gerenciam usuários".into()));
    }
    Ok(())
}

/// `true` se a mudança deixaria o sistema sem nenhum admin ativo.
fn removes_last_admin(current: &User, role: UserRole, is_active: bool, other_active_admins: i64) -> bool {
    let was_admin = current.role == UserRole::Admin && current.is_active;
    let stays_admin = role == UserRole::Admin && is_active;
    was_admin && !stays_admin && other_active_admins == 0
}

/// Quantos admins ativos sobram além de `current`; `None` se ele não está entre eles.
fn other_admins(locked: &[Uuid], current: Uuid) -> Option<i64> {
    locked.contains(&current).then(|| locked.len() as i64 - 1)
}

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    person_service: PersonService,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        person_service: PersonService,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, person_service, audit_repo, pool }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<User>, AppError> {
        self.user_repo.list(include_inactive).await
    }

    pub async fn find(&self, id: Uuid) -> Result<User, AppError> {
        found(self.user_repo.find_by_id(&self.pool, id).await?, "Usuário")
    }

    /// Usado pela camada de autenticação; a comparação ignora maiúsculas.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.user_repo.find_by_email(email).await
    }

    pub async fn create(&self, actor: &Actor, input: NewUser) -> Result<User, AppError> {
        require_admin(actor)?;
        input.validate()?;
        let email = input.email.trim().to_lowercase();

        let mut tx = self.pool.begin().await?;
        let person_id = self.person_service.resolve_ref(&mut tx, actor, &input.person).await?;
        let user = self
            .user_repo
            .create(&mut *tx, person_id, &email, &input.password_hash, input.role)
            .await?;
        let entry = AuditEntry::new(AuditAction::Create, USERS, user.id, format!("Usuário '{}' criado", user.email))
            .after(&user);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Usuário '{}' criado com perfil {:?}", user.email, user.role);
        Ok(user)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, input: UpdateUser) -> Result<User, AppError> {
        require_admin(actor)?;
        input.validate()?;
        let email = input.email.as_deref().map(|e| e.trim().to_lowercase());

        let mut tx = self.pool.begin().await?;
        let before = found(self.user_repo.find_by_id(&mut *tx, id).await?, "Usuário")?;
        let role = input.role.unwrap_or(before.role);
        self.guard_last_admin(&mut tx, &before, role, before.is_active).await?;

        let after = self
            .user_repo
            .update(&mut *tx, id, email.as_deref(), input.password_hash.as_deref(), input.role)
            .await?;
        let after = found(after, "Usuário")?;
        let entry = AuditEntry::new(AuditAction::Update, USERS, id, format!("Usuário '{}' atualizado", after.email))
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<User, AppError> {
        self.change_status(actor, id, Some(false), true).await
    }

    pub async fn set_status(&self, actor: &Actor, id: Uuid, active: bool) -> Result<User, AppError> {
        self.change_status(actor, id, Some(active), false).await
    }

    pub async fn toggle_status(&self, actor: &Actor, id: Uuid) -> Result<User, AppError> {
        self.change_status(actor, id, None, false).await
    }

    async fn change_status(&self, actor: &Actor, id: Uuid, target: Option<bool>, deleted: bool) -> Result<User, AppError> {
        require_admin(actor)?;

        let mut tx = self.pool.begin().await?;
        let before = found(self.user_repo.find_by_id(&mut *tx, id).await?, "Usuário")?;
        if target == Some(before.is_active) {
            return Ok(before);
        }
        let next_active = target.unwrap_or(!before.is_active);
        self.guard_last_admin(&mut tx, &before, before.role, next_active).await?;

        let after = match target {
            Some(flag) => self.user_repo.set_active(&mut *tx, id, flag).await?,
            None => self.user_repo.toggle(&mut *tx, id).await?,
        };
        let after = found(after, "Usuário")?;
        let entry = status_entry(USERS, "Usuário", id, after.is_active, deleted, &before, &after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }

    async fn guard_last_admin(
        &self,
        conn: &mut PgConnection,
        current: &User,
        role: UserRole,
        is_active: bool,
    ) -> Result<(), AppError> {
        if current.role != UserRole::Admin || !current.is_active {
            return Ok(());
        }
        let admins = self.user_repo.lock_active_admins(&mut *conn).await?;
        let Some(others) = other_admins(&admins, current.id) else {
            // Deixou de ser admin ativo enquanto esperava o lock.
            return Ok(());
        };
        if removes_last_admin(current, role, is_active, others) {
            return Err(AppError::BusinessRule(
                "Não é possível remover o último administrador ativo.".into(),
            ));
        }
        Ok(())
    }
}

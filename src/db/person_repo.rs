// src/db/person_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{find_row, set_active, toggle_active},
    models::person::{Address, AddressInput, Contact, ContactInput, Person},
};

pub const CONTACTS: &str = "contacts";
pub const ADDRESSES: &str = "addresses";
pub const PERSONS: &str = "persons";

// O repositório de pessoas, responsável pelas tabelas 'persons', 'contacts' e 'addresses'
#[derive(Clone)]
pub struct PersonRepository {
    pool: PgPool,
}

impl PersonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CONTATOS
    // =========================================================================

    pub async fn list_contacts(&self, include_inactive: bool) -> Result<Vec<Contact>, AppError> {
        let contacts = sqlx::query_as::<_, Contact>(
            "SELECT * FROM contacts WHERE ($1 OR is_active) ORDER BY full_name ASC",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    pub async fn find_contact<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Contact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, CONTACTS, id, false).await
    }

    /// `full_name` é obrigatório aqui; o serviço garante antes de chamar.
    pub async fn create_contact<'e, E>(
        &self,
        executor: E,
        full_name: &str,
        input: &ContactInput,
        created_by: Option<Uuid>,
    ) -> Result<Contact, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (full_name, phone, email, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(full_name)
        .bind(input.phone.as_deref())
        .bind(input.email.as_deref())
        .bind(created_by)
        .fetch_one(executor)
        .await?;
        Ok(contact)
    }

    /// Atualização parcial: campos ausentes mantêm o valor atual.
    pub async fn update_contact<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &ContactInput,
    ) -> Result<Option<Contact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts SET
                full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                email = COALESCE($4, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.full_name.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.email.as_deref())
        .fetch_optional(executor)
        .await?;
        Ok(contact)
    }

    pub async fn set_contact_active<'e, E>(&self, executor: E, id: Uuid, active: bool) -> Result<Option<Contact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        set_active(executor, CONTACTS, id, active).await
    }

    pub async fn toggle_contact<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Contact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        toggle_active(executor, CONTACTS, id).await
    }

    // =========================================================================
    //  ENDEREÇOS
    // =========================================================================

    pub async fn list_addresses(&self, include_inactive: bool) -> Result<Vec<Address>, AppError> {
        let addresses = sqlx::query_as::<_, Address>(
            "SELECT * FROM addresses WHERE ($1 OR is_active) ORDER BY city ASC, street ASC",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(addresses)
    }

    pub async fn find_address<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Address>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, ADDRESSES, id, false).await
    }

    /// `street`, `city` e `state` são obrigatórios; o serviço garante antes de chamar.
    pub async fn create_address<'e, E>(
        &self,
        executor: E,
        street: &str,
        city: &str,
        state: &str,
        input: &AddressInput,
    ) -> Result<Address, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (street, number, complement, neighborhood, city, state, zip_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(street)
        .bind(input.number.as_deref())
        .bind(input.complement.as_deref())
        .bind(input.neighborhood.as_deref())
        .bind(city)
        .bind(state)
        .bind(input.zip_code.as_deref())
        .fetch_one(executor)
        .await?;
        Ok(address)
    }

    pub async fn update_address<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &AddressInput,
    ) -> Result<Option<Address>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = sqlx::query_as::<_, Address>(
            r#"
            UPDATE addresses SET
                street = COALESCE($2, street),
                number = COALESCE($3, number),
                complement = COALESCE($4, complement),
                neighborhood = COALESCE($5, neighborhood),
                city = COALESCE($6, city),
                state = COALESCE($7, state),
                zip_code = COALESCE($8, zip_code),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.street.as_deref())
        .bind(input.number.as_deref())
        .bind(input.complement.as_deref())
        .bind(input.neighborhood.as_deref())
        .bind(input.city.as_deref())
        .bind(input.state.as_deref())
        .bind(input.zip_code.as_deref())
        .fetch_optional(executor)
        .await?;
        Ok(address)
    }

    pub async fn set_address_active<'e, E>(&self, executor: E, id: Uuid, active: bool) -> Result<Option<Address>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        set_active(executor, ADDRESSES, id, active).await
    }

    pub async fn toggle_address<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Address>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        toggle_active(executor, ADDRESSES, id).await
    }

    // =========================================================================
    //  PESSOAS
    // =========================================================================

    pub async fn list_persons(&self, include_inactive: bool) -> Result<Vec<Person>, AppError> {
        let persons = sqlx::query_as::<_, Person>(
            "SELECT * FROM persons WHERE ($1 OR is_active) ORDER BY name ASC",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(persons)
    }

    pub async fn find_person<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Person>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        find_row(executor, PERSONS, id, false).await
    }

    pub async fn create_person<'e, E>(
        &self,
        executor: E,
        name: &str,
        contact_id: Option<Uuid>,
        address_id: Option<Uuid>,
    ) -> Result<Person, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let person = sqlx::query_as::<_, Person>(
            r#"
            INSERT INTO persons (name, contact_id, address_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(contact_id)
        .bind(address_id)
        .fetch_one(executor)
        .await?;
        Ok(person)
    }

    /// Grava o estado final da pessoa (o serviço já resolveu os vínculos).
    pub async fn update_person<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        contact_id: Option<Uuid>,
        address_id: Option<Uuid>,
    ) -> Result<Option<Person>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let person = sqlx::query_as::<_, Person>(
            r#"
            UPDATE persons SET
                name = $2,
                contact_id = $3,
                address_id = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(contact_id)
        .bind(address_id)
        .fetch_optional(executor)
        .await?;
        Ok(person)
    }

    pub async fn set_person_active<'e, E>(&self, executor: E, id: Uuid, active: bool) -> Result<Option<Person>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        set_active(executor, PERSONS, id, active).await
    }

    pub async fn toggle_person<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Person>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        toggle_active(executor, PERSONS, id).await
    }
}

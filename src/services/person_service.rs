// src/services/person_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{
        person_repo::{ADDRESSES, CONTACTS, PERSONS},
        AuditRepository, PersonRepository,
    },
    models::{
        audit::{Actor, AuditAction, AuditEntry},
        person::{
            plan_link, Address, AddressInput, Contact, ContactInput, LinkPlan, NewPerson, Person,
            PersonDetail, PersonRef, UpdatePerson,
        },
    },
    services::{active, found, status_entry},
};

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Nome da pessoa sem espaços nas pontas. Só espaços conta como vazio.
fn required_name(raw: &str) -> Result<&str, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::BusinessRule("O nome é obrigatório.".into()));
    }
    Ok(name)
}

/// Rua, cidade e UF são obrigatórias para criar um endereço.
fn address_required(input: &AddressInput) -> Result<(&str, &str, &str), AppError> {
    match (text(&input.street), text(&input.city), text(&input.state)) {
        (Some(street), Some(city), Some(state)) => Ok((street, city, state)),
        _ => Err(AppError::BusinessRule(
            "O endereço precisa de rua, cidade e UF.".into(),
        )),
    }
}

#[derive(Clone)]
pub struct PersonService {
    person_repo: PersonRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl PersonService {
    pub fn new(person_repo: PersonRepository, audit_repo: AuditRepository, pool: PgPool) -> Self {
        Self { person_repo, audit_repo, pool }
    }

    // =========================================================================
    //  PESSOA (composta: pessoa + contato + endereço)
    // =========================================================================

    pub async fn list_persons(&self, include_inactive: bool) -> Result<Vec<Person>, AppError> {
        self.person_repo.list_persons(include_inactive).await
    }

    pub async fn find_person(&self, id: Uuid) -> Result<Person, AppError> {
        found(self.person_repo.find_person(&self.pool, id).await?, "Pessoa")
    }

    pub async fn find_person_detail(&self, id: Uuid) -> Result<PersonDetail, AppError> {
        let person = self.find_person(id).await?;
        let contact = match person.contact_id {
            Some(contact_id) => self.person_repo.find_contact(&self.pool, contact_id).await?,
            None => None,
        };
        let address = match person.address_id {
            Some(address_id) => self.person_repo.find_address(&self.pool, address_id).await?,
            None => None,
        };
        Ok(PersonDetail { person, contact, address })
    }

    /// Cria pessoa, contato e endereço numa única transação.
    pub async fn create_person(&self, actor: &Actor, input: NewPerson) -> Result<PersonDetail, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let person = self.create_person_in(&mut tx, actor, &input).await?;
        tx.commit().await?;

        tracing::info!("Pessoa '{}' criada ({})", person.name, person.id);
        self.find_person_detail(person.id).await
    }

    pub async fn update_person(&self, actor: &Actor, id: Uuid, input: UpdatePerson) -> Result<PersonDetail, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let before = found(self.person_repo.find_person(&mut *tx, id).await?, "Pessoa")?;

        let name = match input.name.as_deref() {
            Some(raw) => required_name(raw)?.to_string(),
            None => before.name.clone(),
        };
        let contact_plan = plan_link(
            input.contact_id,
            input.contact.as_ref(),
            ContactInput::is_empty,
            before.contact_id,
        );
        let contact_id = self
            .resolve_contact(&mut tx, actor, contact_plan, &name, before.contact_id)
            .await?;
        let address_plan = plan_link(
            input.address_id,
            input.address.as_ref(),
            AddressInput::is_empty,
            before.address_id,
        );
        let address_id = self
            .resolve_address(&mut tx, actor, address_plan, before.address_id)
            .await?;

        let after = found(
            self.person_repo
                .update_person(&mut *tx, id, &name, contact_id, address_id)
                .await?,
            "Pessoa",
        )?;
        let entry = AuditEntry::new(AuditAction::Update, PERSONS, id, format!("Pessoa '{}' atualizada", after.name))
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        self.find_person_detail(id).await
    }

    pub async fn delete_person(&self, actor: &Actor, id: Uuid) -> Result<Person, AppError> {
        self.person_status(actor, id, Some(false), true).await
    }

    pub async fn set_person_status(&self, actor: &Actor, id: Uuid, active: bool) -> Result<Person, AppError> {
        self.person_status(actor, id, Some(active), false).await
    }

    pub async fn toggle_person(&self, actor: &Actor, id: Uuid) -> Result<Person, AppError> {
        self.person_status(actor, id, None, false).await
    }

    async fn person_status(&self, actor: &Actor, id: Uuid, target: Option<bool>, deleted: bool) -> Result<Person, AppError> {
        let mut tx = self.pool.begin().await?;
        let before = found(self.person_repo.find_person(&mut *tx, id).await?, "Pessoa")?;
        if target == Some(before.is_active) {
            return Ok(before);
        }
        let after = match target {
            Some(flag) => self.person_repo.set_person_active(&mut *tx, id, flag).await?,
            None => self.person_repo.toggle_person(&mut *tx, id).await?,
        };
        let after = found(after, "Pessoa")?;
        let entry = status_entry(PERSONS, "Pessoa", id, after.is_active, deleted, &before, &after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }

    /// Resolve a pessoa de um cliente/fornecedor/usuário dentro da transação do chamador:
    /// reaproveita `person_id` (ativa) ou cria a pessoa aninhada.
    pub(crate) async fn resolve_ref(
        &self,
        conn: &mut PgConnection,
        actor: &Actor,
        person_ref: &PersonRef,
    ) -> Result<Uuid, AppError> {
        if let Some(person_id) = person_ref.person_id {
            let person = self.person_repo.find_person(&mut *conn, person_id).await?;
            return Ok(active(person, "Pessoa", |p| p.is_active)?.id);
        }
        match &person_ref.person {
            Some(new_person) => Ok(self.create_person_in(conn, actor, new_person).await?.id),
            None => Err(AppError::BusinessRule(
                "Informe uma pessoa existente (personId) ou os dados da nova pessoa.".into(),
            )),
        }
    }

    async fn create_person_in(&self, conn: &mut PgConnection, actor: &Actor, input: &NewPerson) -> Result<Person, AppError> {
        let name = required_name(&input.name)?;
        let contact_plan = plan_link(input.contact_id, input.contact.as_ref(), ContactInput::is_empty, None);
        let contact_id = self.resolve_contact(conn, actor, contact_plan, name, None).await?;
        let address_plan = plan_link(input.address_id, input.address.as_ref(), AddressInput::is_empty, None);
        let address_id = self.resolve_address(conn, actor, address_plan, None).await?;

        let person = self
            .person_repo
            .create_person(&mut *conn, name, contact_id, address_id)
            .await?;
        let entry = AuditEntry::new(AuditAction::Create, PERSONS, person.id, format!("Pessoa '{}' criada", person.name))
            .after(&person);
        self.audit_repo.insert(&mut *conn, actor, &entry).await?;
        Ok(person)
    }

    async fn resolve_contact(
        &self,
        conn: &mut PgConnection,
        actor: &Actor,
        plan: LinkPlan<'_, ContactInput>,
        person_name: &str,
        current: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        match plan {
            LinkPlan::Reuse(id) => {
                let contact = self.person_repo.find_contact(&mut *conn, id).await?;
                Ok(Some(active(contact, "Contato", |c| c.is_active)?.id))
            }
            LinkPlan::UpdateExisting(id, fields) => {
                let before = found(self.person_repo.find_contact(&mut *conn, id).await?, "Contato")?;
                let after = found(self.person_repo.update_contact(&mut *conn, id, fields).await?, "Contato")?;
                let entry = AuditEntry::new(AuditAction::Update, CONTACTS, id, "Contato atualizado")
                    .before(&before)
                    .after(&after);
                self.audit_repo.insert(&mut *conn, actor, &entry).await?;
                Ok(Some(id))
            }
            LinkPlan::Create(fields) => {
                // Sem nome próprio, o contato herda o nome da pessoa.
                let full_name = text(&fields.full_name).unwrap_or(person_name);
                let contact = self
                    .person_repo
                    .create_contact(&mut *conn, full_name, fields, Some(actor.user_id))
                    .await?;
                let entry = AuditEntry::new(AuditAction::Create, CONTACTS, contact.id, "Contato criado").after(&contact);
                self.audit_repo.insert(&mut *conn, actor, &entry).await?;
                Ok(Some(contact.id))
            }
            LinkPlan::Keep => Ok(current),
        }
    }

    async fn resolve_address(
        &self,
        conn: &mut PgConnection,
        actor: &Actor,
        plan: LinkPlan<'_, AddressInput>,
        current: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        match plan {
            LinkPlan::Reuse(id) => {
                let address = self.person_repo.find_address(&mut *conn, id).await?;
                Ok(Some(active(address, "Endereço", |a| a.is_active)?.id))
            }
            LinkPlan::UpdateExisting(id, fields) => {
                let before = found(self.person_repo.find_address(&mut *conn, id).await?, "Endereço")?;
                let after = found(self.person_repo.update_address(&mut *conn, id, fields).await?, "Endereço")?;
                let entry = AuditEntry::new(AuditAction::Update, ADDRESSES, id, "Endereço atualizado")
                    .before(&before)
                    .after(&after);
                self.audit_repo.insert(&mut *conn, actor, &entry).await?;
                Ok(Some(id))
            }
            LinkPlan::Create(fields) => {
                let (street, city, state) = address_required(fields)?;
                let address = self
                    .person_repo
                    .create_address(&mut *conn, street, city, state, fields)
                    .await?;
                let entry = AuditEntry::new(AuditAction::Create, ADDRESSES, address.id, "Endereço criado").after(&address);
                self.audit_repo.insert(&mut *conn, actor, &entry).await?;
                Ok(Some(address.id))
            }
            LinkPlan::Keep => Ok(current),
        }
    }

    // =========================================================================
    //  CONTATO
    // =========================================================================

    pub async fn list_contacts(&self, include_inactive: bool) -> Result<Vec<Contact>, AppError> {
        self.person_repo.list_contacts(include_inactive).await
    }

    pub async fn find_contact(&self, id: Uuid) -> Result<Contact, AppError> {
        found(self.person_repo.find_contact(&self.pool, id).await?, "Contato")
    }

    pub async fn create_contact(&self, actor: &Actor, input: ContactInput) -> Result<Contact, AppError> {
        input.validate()?;
        let full_name = text(&input.full_name)
            .ok_or_else(|| AppError::BusinessRule("O nome do contato é obrigatório.".into()))?;

        let mut tx = self.pool.begin().await?;
        let contact = self
            .person_repo
            .create_contact(&mut *tx, full_name, &input, Some(actor.user_id))
            .await?;
        let entry = AuditEntry::new(AuditAction::Create, CONTACTS, contact.id, "Contato criado").after(&contact);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(contact)
    }

    pub async fn update_contact(&self, actor: &Actor, id: Uuid, input: ContactInput) -> Result<Contact, AppError> {
        input.validate()?;
        let mut tx = self.pool.begin().await?;
        let contact = self
            .resolve_contact(&mut tx, actor, LinkPlan::UpdateExisting(id, &input), "", Some(id))
            .await?;
        tx.commit().await?;
        self.find_contact(contact.unwrap_or(id)).await
    }

    pub async fn delete_contact(&self, actor: &Actor, id: Uuid) -> Result<Contact, AppError> {
        self.contact_status(actor, id, Some(false), true).await
    }

    pub async fn set_contact_status(&self, actor: &Actor, id: Uuid, active: bool) -> Result<Contact, AppError> {
        self.contact_status(actor, id, Some(active), false).await
    }

    pub async fn toggle_contact(&self, actor: &Actor, id: Uuid) -> Result<Contact, AppError> {
        self.contact_status(actor, id, None, false).await
    }

    async fn contact_status(&self, actor: &Actor, id: Uuid, target: Option<bool>, deleted: bool) -> Result<Contact, AppError> {
        let mut tx = self.pool.begin().await?;
        let before = found(self.person_repo.find_contact(&mut *tx, id).await?, "Contato")?;
        if target == Some(before.is_active) {
            return Ok(before);
        }
        let after = match target {
            Some(flag) => self.person_repo.set_contact_active(&mut *tx, id, flag).await?,
            None => self.person_repo.toggle_contact(&mut *tx, id).await?,
        };
        let after = found(after, "Contato")?;
        let entry = status_entry(CONTACTS, "Contato", id, after.is_active, deleted, &before, &after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }

    // =========================================================================
    //  ENDEREÇO
    // =========================================================================

    pub async fn list_addresses(&self, include_inactive: bool) -> Result<Vec<Address>, AppError> {
        self.person_repo.list_addresses(include_inactive).await
    }

    pub async fn find_address(&self, id: Uuid) -> Result<Address, AppError> {
        found(self.person_repo.find_address(&self.pool, id).await?, "Endereço")
    }

    pub async fn create_address(&self, actor: &Actor, input: AddressInput) -> Result<Address, AppError> {
        input.validate()?;
        let mut tx = self.pool.begin().await?;
        let id = self
            .resolve_address(&mut tx, actor, LinkPlan::Create(&input), None)
            .await?;
        tx.commit().await?;
        self.find_address(found(id, "Endereço")?).await
    }

    pub async fn update_address(&self, actor: &Actor, id: Uuid, input: AddressInput) -> Result<Address, AppError> {
        input.validate()?;
        let mut tx = self.pool.begin().await?;
        self.resolve_address(&mut tx, actor, LinkPlan::UpdateExisting(id, &input), Some(id))
            .await?;
        tx.commit().await?;
        self.find_address(id).await
    }

    pub async fn delete_address(&self, actor: &Actor, id: Uuid) -> Result<Address, AppError> {
        self.address_status(actor, id, Some(false), true).await
    }

    pub async fn set_address_status(&self, actor: &Actor, id: Uuid, active: bool) -> Result<Address, AppError> {
        self.address_status(actor, id, Some(active), false).await
    }

    pub async fn toggle_address(&self, actor: &Actor, id: Uuid) -> Result<Address, AppError> {
        self.address_status(actor, id, None, false).await
    }

    async fn address_status(&self, actor: &Actor, id: Uuid, target: Option<bool>, deleted: bool) -> Result<Address, AppError> {
        let mut tx = self.pool.begin().await?;
        let before = found(self.person_repo.find_address(&mut *tx, id).await?, "Endereço")?;
        if target == Some(before.is_active) {
            return Ok(before);
        }
        let after = match target {
            Some(flag) => self.person_repo.set_address_active(&mut *tx, id, flag).await?,
            None => self.person_repo.toggle_address(&mut *tx, id).await?,
        };
        let after = found(after, "Endereço")?;
        let entry = status_entry(ADDRESSES, "Endereço", id, after.is_active, deleted, &before, &after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;
        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_needs_street_city_and_state() {
        let partial = AddressInput { city: Some("Campinas".into()), ..Default::default() };
        assert!(matches!(address_required(&partial), Err(AppError::BusinessRule(_))));

        let full = AddressInput {
            street: Some(" Rua das Flores ".into()),
            city: Some("Campinas".into()),
            state: Some("SP".into()),
            ..Default::default()
        };
        assert_eq!(address_required(&full).unwrap(), ("Rua das Flores", "Campinas", "SP"));
    }

    #[test]
    fn person_name_is_trimmed_and_required() {
        assert_eq!(required_name("  Oficina Souza ").unwrap(), "Oficina Souza");
        let err = required_name("   ").unwrap_err();
        assert_eq!(err.to_string(), "O nome é obrigatório.");
    }

    #[test]
    fn blank_text_counts_as_missing() {
        assert_eq!(text(&Some("   ".into())), None);
        assert_eq!(text(&Some(" Ana ".into())), Some("Ana"));
        assert_eq!(text(&None), None);
    }
}

// src/models/person.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::validate_not_blank;

// --- Contato ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    #[validate(length(max = 150, message = "O nome deve ter no máximo 150 caracteres."))]
    pub full_name: Option<String>,
    #[validate(length(max = 30, message = "Telefone muito longo."))]
    pub phone: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
}

// --- Endereço ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub street: String,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    #[validate(length(max = 150))]
    pub street: Option<String>,
    #[validate(length(max = 20))]
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(equal = 2, message = "A UF deve ter 2 letras."))]
    pub state: Option<String>,
    #[validate(length(min = 8, max = 9, message = "CEP inválido."))]
    pub zip_code: Option<String>,
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl ContactInput {
    /// Um contato aninhado "vazio" é ignorado em vez de criado.
    pub fn is_empty(&self) -> bool {
        !(has_text(&self.full_name) || has_text(&self.phone) || has_text(&self.email))
    }
}

impl AddressInput {
    pub fn is_empty(&self) -> bool {
        ![
            &self.street,
            &self.number,
            &self.complement,
            &self.neighborhood,
            &self.city,
            &self.state,
            &self.zip_code,
        ]
        .into_iter()
        .any(has_text)
    }
}

// --- Pessoa ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    pub contact_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: Person,
    pub contact: Option<Contact>,
    pub address: Option<Address>,
}

/// Entrada da pessoa composta: cada vínculo pode ser um id existente,
/// campos aninhados para criar um registro novo, ou nada.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    #[validate(
        length(min = 1, max = 150, message = "O nome é obrigatório."),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    pub contact_id: Option<Uuid>,
    #[validate(nested)]
    pub contact: Option<ContactInput>,
    pub address_id: Option<Uuid>,
    #[validate(nested)]
    pub address: Option<AddressInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePerson {
    #[validate(length(min = 1, max = 150, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    pub contact_id: Option<Uuid>,
    #[validate(nested)]
    pub contact: Option<ContactInput>,
    pub address_id: Option<Uuid>,
    #[validate(nested)]
    pub address: Option<AddressInput>,
}

/// Como o serviço deve resolver o vínculo com contato/endereço.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkPlan<'a, T> {
    /// Reaproveita um registro existente (precisa existir e estar ativo).
    Reuse(Uuid),
    /// Atualiza o registro que a pessoa já possui.
    UpdateExisting(Uuid, &'a T),
    /// Cria um registro novo a partir dos campos aninhados.
    Create(&'a T),
    /// Mantém o vínculo atual (ou nenhum, na criação).
    Keep,
}

/// Decide o que fazer com um vínculo.
/// Ordem: id explícito > campos aninhados não vazios > manter.
pub fn plan_link<'a, T>(
    explicit_id: Option<Uuid>,
    nested: Option<&'a T>,
    is_empty: impl Fn(&T) -> bool,
    current_id: Option<Uuid>,
) -> LinkPlan<'a, T> {
    if let Some(id) = explicit_id {
        return LinkPlan::Reuse(id);
    }
    match nested.filter(|n| !is_empty(*n)) {
        Some(fields) => match current_id {
            Some(current) => LinkPlan::UpdateExisting(current, fields),
            None => LinkPlan::Create(fields),
        },
        None => LinkPlan::Keep,
    }
}

/// Referência a uma pessoa usada por cliente, fornecedor e usuário:
/// ou `personId` de uma pessoa existente, ou `person` para criar junto.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PersonRef {
    pub person_id: Option<Uuid>,
    #[validate(nested)]
    pub person: Option<NewPerson>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str) -> ContactInput {
        ContactInput { full_name: Some(name.into()), ..Default::default() }
    }

    #[test]
    fn person_name_made_of_spaces_is_invalid() {
        let blank = NewPerson { name: "   ".into(), ..Default::default() };
        assert!(blank.validate().is_err());
        let named = NewPerson { name: "Maria".into(), ..Default::default() };
        assert!(named.validate().is_ok());
    }

    #[test]
    fn explicit_id_wins_over_nested_fields() {
        let id = Uuid::new_v4();
        let nested = contact("Maria");
        let plan = plan_link(Some(id), Some(&nested), ContactInput::is_empty, None);
        assert_eq!(plan, LinkPlan::Reuse(id));
    }

    #[test]
    fn nested_fields_create_when_person_has_no_link() {
        let nested = contact("Maria");
        let plan = plan_link(None, Some(&nested), ContactInput::is_empty, None);
        assert!(matches!(plan, LinkPlan::Create(c) if c.full_name.as_deref() == Some("Maria")));
    }

    #[test]
    fn nested_fields_update_existing_link() {
        let current = Uuid::new_v4();
        let nested = contact("Maria");
        let plan = plan_link(None, Some(&nested), ContactInput::is_empty, Some(current));
        assert!(matches!(plan, LinkPlan::UpdateExisting(id, _) if id == current));
    }

    #[test]
    fn blank_nested_fields_are_skipped() {
        let blank = ContactInput { full_name: Some("   ".into()), phone: Some(String::new()), email: None };
        assert!(blank.is_empty());
        let plan = plan_link(None, Some(&blank), ContactInput::is_empty, None);
        assert_eq!(plan, LinkPlan::Keep);

        let address = AddressInput::default();
        assert!(address.is_empty());
        let address = AddressInput { city: Some("Campinas".into()), ..Default::default() };
        assert!(!address.is_empty());
    }
}

// src/common/validation.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

use crate::common::error::AppError;

// ---
// Validações customizadas usadas pelos `#[derive(Validate)]`
// ---

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

/// Maior valor que cabe numa coluna NUMERIC(12,2).
pub const MAX_MONEY: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Maior quantidade aceita numa linha de venda, compra ou troca.
pub const MAX_LINE_QUANTITY: i32 = 100_000;

pub fn is_valid_money(val: &Decimal) -> bool {
    !(val.is_sign_negative() && !val.is_zero()) && *val <= MAX_MONEY
}

/// Valores monetários: não negativos e dentro da faixa da coluna no banco.
pub fn validate_money(val: &Decimal) -> Result<(), ValidationError> {
    validate_not_negative(val)?;
    if *val > MAX_MONEY {
        let mut err = ValidationError::new("range");
        err.add_param("max".into(), &MAX_MONEY);
        err.message = Some("O valor excede o máximo permitido (9999999999,99).".into());
        return Err(err);
    }
    Ok(())
}

/// `length(min = 1)` aceita "   "; aqui o texto precisa ter algo além de espaços.
pub fn validate_not_blank(val: &str) -> Result<(), ValidationError> {
    if val.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("O campo não pode ficar em branco.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Documentos (CPF / CNPJ)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "document_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    Cpf,
    Cnpj,
}

impl DocumentType {
    /// Descobre o tipo pelo número de dígitos (11 = CPF, 14 = CNPJ).
    pub fn detect(digits: &str) -> Option<Self> {
        match digits.len() {
            11 => Some(DocumentType::Cpf),
            14 => Some(DocumentType::Cnpj),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentType::Cpf => "CPF",
            DocumentType::Cnpj => "CNPJ",
        }
    }
}

/// Remove pontuação ("111.444.777-35" -> "11144477735").
pub fn normalize_document(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn digits_of(doc: &str) -> Option<Vec<u32>> {
    doc.chars().map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn cpf_check_digit(digits: &[u32]) -> u32 {
    let first_weight = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (first_weight - i as u32))
        .sum();
    let rest = (sum * 10) % 11;
    if rest == 10 { 0 } else { rest }
}

pub fn is_valid_cpf(raw: &str) -> bool {
    let doc = normalize_document(raw);
    let Some(digits) = digits_of(&doc) else { return false };
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }
    cpf_check_digit(&digits[..9]) == digits[9] && cpf_check_digit(&digits[..10]) == digits[10]
}

const CNPJ_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

fn cnpj_check_digit(digits: &[u32]) -> u32 {
    // 12 dígitos usam os pesos a partir do índice 1; 13 dígitos usam todos.
    let weights = &CNPJ_WEIGHTS[CNPJ_WEIGHTS.len() - digits.len()..];
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rest = sum % 11;
    if rest < 2 { 0 } else { 11 - rest }
}

pub fn is_valid_cnpj(raw: &str) -> bool {
    let doc = normalize_document(raw);
    let Some(digits) = digits_of(&doc) else { return false };
    if digits.len() != 14 || all_same(&digits) {
        return false;
    }
    cnpj_check_digit(&digits[..12]) == digits[12] && cnpj_check_digit(&digits[..13]) == digits[13]
}

/// Normaliza e valida um documento, aceitando apenas os tipos informados.
/// Retorna os dígitos (forma gravada no banco) e o tipo detectado.
pub fn parse_document(raw: &str, accepted: &[DocumentType]) -> Result<(String, DocumentType), AppError> {
    let digits = normalize_document(raw);
    let doc_type = DocumentType::detect(&digits)
        .filter(|t| accepted.contains(t))
        .ok_or(AppError::InvalidDocument("Documento"))?;

    let valid = match doc_type {
        DocumentType::Cpf => is_valid_cpf(&digits),
        DocumentType::Cnpj => is_valid_cnpj(&digits),
    };
    if !valid {
        return Err(AppError::InvalidDocument(doc_type.label()));
    }
    Ok((digits, doc_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_valid_cpf() {
        assert!(is_valid_cpf("111.444.777-35"));
        assert!(is_valid_cpf("11144477735"));
        assert!(is_valid_cpf("529.982.247-25"));
    }

    #[test]
    fn rejects_invalid_cpf() {
        assert!(!is_valid_cpf("111.444.777-36"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("1234567890"));
        assert!(!is_valid_cpf(""));
    }

    #[test]
    fn accepts_known_valid_cnpj() {
        assert!(is_valid_cnpj("11.222.333/0001-81"));
        assert!(is_valid_cnpj("11222333000181"));
    }

    #[test]
    fn rejects_invalid_cnpj() {
        assert!(!is_valid_cnpj("11.222.333/0001-82"));
        assert!(!is_valid_cnpj("00.000.000/0000-00"));
        assert!(!is_valid_cnpj("11.222.333/0001"));
    }

    #[test]
    fn parse_document_detects_type_and_strips_punctuation() {
        let (digits, kind) = parse_document("111.444.777-35", &[DocumentType::Cpf, DocumentType::Cnpj]).unwrap();
        assert_eq!(digits, "11144477735");
        assert_eq!(kind, DocumentType::Cpf);

        let (digits, kind) = parse_document("11.222.333/0001-81", &[DocumentType::Cnpj]).unwrap();
        assert_eq!(digits, "11222333000181");
        assert_eq!(kind, DocumentType::Cnpj);
    }

    #[test]
    fn parse_document_rejects_type_not_accepted() {
        let err = parse_document("111.444.777-35", &[DocumentType::Cnpj]).unwrap_err();
        assert!(matches!(err, AppError::InvalidDocument("Documento")));
    }

    #[test]
    fn parse_document_reports_bad_check_digit_by_type() {
        let err = parse_document("111.444.777-00", &[DocumentType::Cpf]).unwrap_err();
        assert!(matches!(err, AppError::InvalidDocument("CPF")));
    }

    #[test]
    fn not_negative_accepts_zero_and_rejects_negatives() {
        assert!(validate_not_negative(&Decimal::ZERO).is_ok());
        assert!(validate_not_negative(&Decimal::new(1050, 2)).is_ok());
        assert!(validate_not_negative(&Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn money_is_bounded_by_the_column_range() {
        assert_eq!(MAX_MONEY, Decimal::new(999_999_999_999, 2));
        assert!(validate_money(&MAX_MONEY).is_ok());
        assert!(validate_money(&Decimal::ZERO).is_ok());
        assert!(validate_money(&Decimal::new(1_000_000_000_000, 2)).is_err());
        assert!(validate_money(&(&Decimal::new(7, 0) * Decimal::new(10_i64.pow(18), 0))).is_err());
        assert!(validate_money(&Decimal::new(-1, 2)).is_err());
        assert!(!is_valid_money(&Decimal::new(1_000_000_000_000, 2)));
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(validate_not_blank("Oficina do Zé").is_ok());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
    }
}

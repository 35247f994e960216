// src/config.rs

use std::{env, str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        AuditRepository, CatalogRepository, CustomerRepository, ExchangeRepository, PartRepository,
        PersonRepository, PurchaseRepository, SaleRepository, SupplierRepository, UserRepository,
    },
    services::{
        AuditService, CatalogService, CustomerService, ExchangeService, PartService, PersonService,
        PurchaseService, SaleService, SupplierService, UserService,
    },
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub low_stock_report_limit: i64,
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} inválido: '{raw}'")),
        None => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Separado de `from_env` para poder ser testado sem mexer no ambiente do processo.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("DATABASE_URL deve ser definida")?;

        Ok(Self {
            database_url,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            acquire_timeout: Duration::from_secs(parse_or(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", 3)?),
            low_stock_report_limit: parse_or(&lookup, "LOW_STOCK_REPORT_LIMIT", 20)?,
        })
    }
}

/// O estado compartilhado: pool e serviços já montados.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Settings,
    pub audit_service: AuditService,
    pub person_service: PersonService,
    pub catalog_service: CatalogService,
    pub part_service: PartService,
    pub customer_service: CustomerService,
    pub supplier_service: SupplierService,
    pub user_service: UserService,
    pub sale_service: SaleService,
    pub purchase_service: PurchaseService,
    pub exchange_service: ExchangeService,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(Self::from_pool(db_pool, settings))
    }

    /// Monta o estado sobre um pool já aberto (os testes de integração usam o pool do `sqlx::test`).
    pub fn from_pool(db_pool: PgPool, settings: Settings) -> Self {
        // --- Monta o gráfico de dependências ---
        let audit_repo = AuditRepository::new(db_pool.clone());
        let person_repo = PersonRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let part_repo = PartRepository::new(db_pool.clone());
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let supplier_repo = SupplierRepository::new(db_pool.clone());
        let user_repo = UserRepository::new(db_pool.clone());
        let sale_repo = SaleRepository::new(db_pool.clone());
        let purchase_repo = PurchaseRepository::new(db_pool.clone());
        let exchange_repo = ExchangeRepository::new(db_pool.clone());

        let person_service = PersonService::new(person_repo, audit_repo.clone(), db_pool.clone());

        Self {
            audit_service: AuditService::new(audit_repo.clone()),
            catalog_service: CatalogService::new(catalog_repo.clone(), audit_repo.clone(), db_pool.clone()),
            part_service: PartService::new(
                part_repo.clone(),
                catalog_repo.clone(),
                audit_repo.clone(),
                db_pool.clone(),
            ),
            customer_service: CustomerService::new(
                customer_repo.clone(),
                person_service.clone(),
                audit_repo.clone(),
                db_pool.clone(),
            ),
            supplier_service: SupplierService::new(
                supplier_repo.clone(),
                person_service.clone(),
                audit_repo.clone(),
                db_pool.clone(),
            ),
            user_service: UserService::new(user_repo, person_service.clone(), audit_repo.clone(), db_pool.clone()),
            sale_service: SaleService::new(
                sale_repo.clone(),
                part_repo.clone(),
                customer_repo,
                catalog_repo,
                exchange_repo.clone(),
                audit_repo.clone(),
                db_pool.clone(),
            ),
            purchase_service: PurchaseService::new(
                purchase_repo,
                part_repo.clone(),
                supplier_repo,
                audit_repo.clone(),
                db_pool.clone(),
            ),
            exchange_service: ExchangeService::new(exchange_repo, sale_repo, part_repo, audit_repo, db_pool.clone()),
            person_service,
            settings,
            db_pool,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_url_is_set() {
        let settings = Settings::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/sipc")])).unwrap();
        assert_eq!(settings.database_url, "postgres://localhost/sipc");
        assert_eq!(settings.max_connections, 5);
        assert_eq!(settings.acquire_timeout, Duration::from_secs(3));
        assert_eq!(settings.low_stock_report_limit, 20);
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/sipc"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("DATABASE_ACQUIRE_TIMEOUT_SECS", " 10 "),
            ("LOW_STOCK_REPORT_LIMIT", "5"),
        ]))
        .unwrap();
        assert_eq!(settings.max_connections, 12);
        assert_eq!(settings.acquire_timeout, Duration::from_secs(10));
        assert_eq!(settings.low_stock_report_limit, 5);
    }

    #[test]
    fn missing_url_or_bad_number_fails() {
        assert!(Settings::from_lookup(lookup(&[])).is_err());
        assert!(Settings::from_lookup(lookup(&[("DATABASE_URL", "  ")])).is_err());

        let err = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/sipc"),
            ("DATABASE_MAX_CONNECTIONS", "muitas"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
    }
}

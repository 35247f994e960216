// tests/service_flows.rs
//
// Fluxos completos contra um Postgres de verdade. Cada teste recebe um banco novo
// do `sqlx::test`, já com as migrações aplicadas (precisa de DATABASE_URL).

use std::time::Duration;

use rust_decimal::Decimal;
use sipc::{
    common::error::AppError,
    config::{AppState, Settings},
    models::{
        audit::{Actor, AuditAction, AuditFilter},
        catalog::{CatalogKind, NewCatalogEntry},
        customer::{NewCustomer, NewSupplier},
        part::NewPart,
        person::{NewPerson, PersonRef, UpdatePerson},
        purchase::{NewPurchase, NewPurchaseItem, PurchaseStatus},
        sale::{NewSale, NewSaleItem, SaleStatus},
        user::{NewUser, UpdateUser, UserRole},
    },
};
use sqlx::PgPool;
use uuid::Uuid;

struct Loja {
    state: AppState,
    admin: Actor,
    customer_id: Uuid,
    supplier_id: Uuid,
    payment_method_id: Uuid,
}

fn new_person(name: &str) -> PersonRef {
    PersonRef { person_id: None, person: Some(NewPerson { name: name.into(), ..Default::default() }) }
}

async fn seed_admin(pool: &PgPool) -> Uuid {
    // O primeiro admin não tem quem o cadastre pelo serviço.
    sqlx::query_scalar::<_, Uuid>(
        r#"
        WITH p AS (INSERT INTO persons (name) VALUES ('Administrador') RETURNING id)
        INSERT INTO users (person_id, email, password_hash, role)
        SELECT id, 'admin@sipc.com.br', 'hash', 'admin'::user_role FROM p
        RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn loja(pool: PgPool) -> Loja {
    let admin = Actor::new(seed_admin(&pool).await, UserRole::Admin);
    let settings = Settings {
        database_url: String::new(),
        max_connections: 5,
        acquire_timeout: Duration::from_secs(3),
        low_stock_report_limit: 20,
    };
    let state = AppState::from_pool(pool, settings);

    let customer = state
        .customer_service
        .create(&admin, NewCustomer { person: new_person("Maria Souza"), document: "111.444.777-35".into() })
        .await
        .unwrap();
    let supplier = state
        .supplier_service
        .create(
            &admin,
            NewSupplier {
                person: new_person("Distribuidora Paulista"),
                document: "11.222.333/0001-81".into(),
                trade_name: None,
            },
        )
        .await
        .unwrap();
    let pix = state
        .catalog_service
        .create(&admin, CatalogKind::PaymentMethod, NewCatalogEntry { name: "Pix".into(), description: None })
        .await
        .unwrap();

    Loja { state, admin, customer_id: customer.id, supplier_id: supplier.id, payment_method_id: pix.id }
}

impl Loja {
    async fn part(&self, name: &str, price: i64, stock: i32) -> Uuid {
        let input = NewPart {
            name: name.into(),
            description: None,
            category_id: None,
            brand_id: None,
            sale_price: Decimal::new(price, 2),
            cost_price: Decimal::ZERO,
            stock_quantity: stock,
            minimum_stock: 0,
            condition: None,
            code: None,
            location: None,
        };
        self.state.part_service.create(&self.admin, input).await.unwrap().id
    }

    async fn stock(&self, part_id: Uuid) -> i32 {
        self.state.part_service.find(part_id).await.unwrap().stock_quantity
    }

    fn sale(&self, lines: &[(Uuid, i32)]) -> NewSale {
        NewSale {
            customer_id: self.customer_id,
            payment_method_id: self.payment_method_id,
            discount: Decimal::ZERO,
            notes: None,
            items: lines
                .iter()
                .map(|&(part_id, quantity)| NewSaleItem { part_id, quantity, unit_price: None, discount: Decimal::ZERO })
                .collect(),
        }
    }

    async fn sell(&self, lines: &[(Uuid, i32)]) -> Uuid {
        let detail = self.state.sale_service.create_sale(&self.admin, self.sale(lines)).await.unwrap();
        detail.header.id
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn finalize_deducts_each_part_exactly_once(pool: PgPool) {
    let loja = loja(pool).await;
    let filtro = loja.part("Filtro de óleo", 3500, 10).await;
    let vela = loja.part("Vela de ignição", 2200, 5).await;

    let sale_id = loja.sell(&[(filtro, 2), (vela, 2), (filtro, 1)]).await;
    // Criar não mexe no estoque.
    assert_eq!(loja.stock(filtro).await, 10);
    assert_eq!(loja.stock(vela).await, 5);

    let sale = loja.state.sale_service.finalize_sale(&loja.admin, sale_id).await.unwrap();
    assert_eq!(sale.status, SaleStatus::Concluida);
    assert!(sale.finalized_at.is_some());
    assert_eq!(sale.total_amount, Decimal::new(14900, 2));
    assert_eq!(loja.stock(filtro).await, 7);
    assert_eq!(loja.stock(vela).await, 3);

    let again = loja.state.sale_service.finalize_sale(&loja.admin, sale_id).await;
    assert!(matches!(again, Err(AppError::InvalidStatusTransition { .. })));
    assert_eq!(loja.stock(filtro).await, 7);
    assert_eq!(loja.stock(vela).await, 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_finalize_leaves_every_part_untouched(pool: PgPool) {
    let loja = loja(pool).await;
    let pastilha = loja.part("Pastilha de freio", 9000, 10).await;
    let disco = loja.part("Disco de freio", 15000, 1).await;

    let first = loja.sell(&[(disco, 1)]).await;
    let second = loja.sell(&[(pastilha, 2), (disco, 1)]).await;
    loja.state.sale_service.finalize_sale(&loja.admin, first).await.unwrap();

    let err = loja.state.sale_service.finalize_sale(&loja.admin, second).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 0, requested: 1, .. }));
    assert_eq!(loja.stock(pastilha).await, 10);
    assert_eq!(loja.stock(disco).await, 0);
    let detail = loja.state.sale_service.find_sale(second).await.unwrap();
    assert_eq!(detail.header.status, SaleStatus::Pendente);
}

#[sqlx::test(migrations = "./migrations")]
async fn cancel_restores_stock_only_for_completed_sales(pool: PgPool) {
    let loja = loja(pool).await;
    let correia = loja.part("Correia dentada", 12000, 8).await;

    let pending = loja.sell(&[(correia, 3)]).await;
    let cancelled = loja.state.sale_service.cancel_sale(&loja.admin, pending).await.unwrap();
    assert_eq!(cancelled.status, SaleStatus::Cancelada);
    assert_eq!(loja.stock(correia).await, 8);

    let completed = loja.sell(&[(correia, 3)]).await;
    loja.state.sale_service.finalize_sale(&loja.admin, completed).await.unwrap();
    assert_eq!(loja.stock(correia).await, 5);
    loja.state.sale_service.cancel_sale(&loja.admin, completed).await.unwrap();
    assert_eq!(loja.stock(correia).await, 8);

    let twice = loja.state.sale_service.cancel_sale(&loja.admin, completed).await;
    assert!(matches!(twice, Err(AppError::InvalidStatusTransition { .. })));
    assert_eq!(loja.stock(correia).await, 8);
}

#[sqlx::test(migrations = "./migrations")]
async fn oversized_quantities_never_reach_the_stock(pool: PgPool) {
    let loja = loja(pool).await;
    let pneu = loja.part("Pneu aro 14", 30000, 0).await;

    let err = loja
        .state
        .sale_service
        .create_sale(&loja.admin, loja.sale(&[(pneu, i32::MAX), (pneu, i32::MAX)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert_eq!(loja.stock(pneu).await, 0);

    let farol = loja.part("Farol", 20000, 5).await;
    let mut huge_price = loja.sale(&[(farol, 2)]);
    huge_price.items[0].unit_price = Some(Decimal::MAX);
    let err = loja.state.sale_service.create_sale(&loja.admin, huge_price).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
    assert_eq!(loja.stock(farol).await, 5);
}

#[sqlx::test(migrations = "./migrations")]
async fn purchase_receive_and_cancel_move_stock(pool: PgPool) {
    let loja = loja(pool).await;
    let bateria = loja.part("Bateria 60Ah", 45000, 0).await;

    let purchase = NewPurchase {
        supplier_id: loja.supplier_id,
        notes: Some("Pedido semanal".into()),
        items: vec![NewPurchaseItem { part_id: bateria, quantity: 4, unit_cost: Decimal::new(31000, 2) }],
    };
    let detail = loja.state.purchase_service.create_purchase(&loja.admin, purchase).await.unwrap();
    assert_eq!(detail.header.total_amount, Decimal::new(124000, 2));
    assert_eq!(loja.stock(bateria).await, 0);

    let received = loja.state.purchase_service.receive_purchase(&loja.admin, detail.header.id).await.unwrap();
    assert_eq!(received.status, PurchaseStatus::Recebida);
    let part = loja.state.part_service.find(bateria).await.unwrap();
    assert_eq!(part.stock_quantity, 4);
    assert_eq!(part.cost_price, Decimal::new(31000, 2));

    let again = loja.state.purchase_service.receive_purchase(&loja.admin, detail.header.id).await;
    assert!(matches!(again, Err(AppError::InvalidStatusTransition { .. })));
    assert_eq!(loja.stock(bateria).await, 4);

    loja.state.purchase_service.cancel_purchase(&loja.admin, detail.header.id).await.unwrap();
    assert_eq!(loja.stock(bateria).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn received_purchase_already_sold_cannot_be_cancelled(pool: PgPool) {
    let loja = loja(pool).await;
    let amortecedor = loja.part("Amortecedor", 28000, 0).await;

    let purchase = NewPurchase {
        supplier_id: loja.supplier_id,
        notes: None,
        items: vec![NewPurchaseItem { part_id: amortecedor, quantity: 2, unit_cost: Decimal::new(20000, 2) }],
    };
    let purchase_id = loja.state.purchase_service.create_purchase(&loja.admin, purchase).await.unwrap().header.id;
    loja.state.purchase_service.receive_purchase(&loja.admin, purchase_id).await.unwrap();

    let sale_id = loja.sell(&[(amortecedor, 1)]).await;
    loja.state.sale_service.finalize_sale(&loja.admin, sale_id).await.unwrap();

    let err = loja.state.purchase_service.cancel_purchase(&loja.admin, purchase_id).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 1, requested: 2, .. }));
    assert_eq!(loja.stock(amortecedor).await, 1);
    let detail = loja.state.purchase_service.find_purchase(purchase_id).await.unwrap();
    assert_eq!(detail.header.status, PurchaseStatus::Recebida);
}

#[sqlx::test(migrations = "./migrations")]
async fn repeated_status_change_is_idempotent(pool: PgPool) {
    let loja = loja(pool).await;
    let catalog = &loja.state.catalog_service;
    let kind = CatalogKind::PaymentMethod;
    let id = loja.payment_method_id;

    let first = catalog.set_status(&loja.admin, kind, id, false).await.unwrap();
    let second = catalog.set_status(&loja.admin, kind, id, false).await.unwrap();
    assert!(!first.is_active);
    assert!(!second.is_active);
    assert_eq!(first.updated_at, second.updated_at);

    assert!(!catalog.find(kind, id).await.unwrap().is_active);
    assert!(catalog.list(kind, false).await.unwrap().iter().all(|e| e.id != id));
    assert!(catalog.list(kind, true).await.unwrap().iter().any(|e| e.id == id));

    let filter = AuditFilter {
        record_id: Some(id),
        action: Some(AuditAction::StatusChange),
        ..Default::default()
    };
    let logs = loja.state.audit_service.list(&filter).await.unwrap();
    assert_eq!(logs.len(), 1);

    // Forma de pagamento inativa não serve para novas vendas.
    let oleo = loja.part("Óleo 5W30", 4500, 3).await;
    let err = loja.state.sale_service.create_sale(&loja.admin, loja.sale(&[(oleo, 1)])).await.unwrap_err();
    assert!(matches!(err, AppError::Inactive(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn last_active_admin_is_protected(pool: PgPool) {
    let loja = loja(pool).await;
    let users = &loja.state.user_service;
    let admin_id = loja.admin.user_id;

    let demote = UpdateUser { role: Some(UserRole::Vendedor), ..Default::default() };
    assert!(matches!(users.update(&loja.admin, admin_id, demote).await, Err(AppError::BusinessRule(_))));
    assert!(matches!(users.set_status(&loja.admin, admin_id, false).await, Err(AppError::BusinessRule(_))));

    let second = users
        .create(
            &loja.admin,
            NewUser {
                person: new_person("Carlos Lima"),
                email: "Carlos@SIPC.com.br".into(),
                password_hash: "hash".into(),
                role: UserRole::Admin,
            },
        )
        .await
        .unwrap();
    assert_eq!(second.email, "carlos@sipc.com.br");

    let demote = UpdateUser { role: Some(UserRole::Vendedor), ..Default::default() };
    let demoted = users.update(&loja.admin, admin_id, demote).await.unwrap();
    assert_eq!(demoted.role, UserRole::Vendedor);

    let carlos = Actor::new(second.id, UserRole::Admin);
    assert!(matches!(users.set_status(&carlos, second.id, false).await, Err(AppError::BusinessRule(_))));
}

#[sqlx::test(migrations = "./migrations")]
async fn blank_person_name_is_rejected(pool: PgPool) {
    let loja = loja(pool).await;
    let persons = &loja.state.person_service;

    let blank = NewPerson { name: "   ".into(), ..Default::default() };
    assert!(matches!(persons.create_person(&loja.admin, blank).await, Err(AppError::ValidationError(_))));

    let detail = persons
        .create_person(&loja.admin, NewPerson { name: "  Auto Center Lima ".into(), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(detail.person.name, "Auto Center Lima");

    let rename = UpdatePerson { name: Some("   ".into()), ..Default::default() };
    let err = persons.update_person(&loja.admin, detail.person.id, rename).await.unwrap_err();
    assert_eq!(err.to_string(), "O nome é obrigatório.");
    assert_eq!(persons.find_person(detail.person.id).await.unwrap().name, "Auto Center Lima");
}

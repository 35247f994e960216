// src/services/sale_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        status::StatusMachine,
        validation::{is_valid_money, MAX_MONEY},
    },
    db::{
        sale_repo::SALES, AuditRepository, CatalogRepository, CustomerRepository, ExchangeRepository,
        PartRepository, SaleRepository,
    },
    models::{
        audit::{Actor, AuditAction, AuditEntry},
        catalog::CatalogKind,
        sale::{NewSale, Sale, SaleDetail, SaleFilter, SaleStatus},
    },
    services::{active, found, stock},
};

/// Linha já precificada, pronta para entrar no total.
#[derive(Debug, Clone, Copy)]
pub struct PricedLine {
    pub part_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount: Decimal,
}

/// `Σ(qtd·preço − desconto do item) − desconto da venda`. Nunca negativo.
pub fn sale_total(lines: &[PricedLine], discount: Decimal) -> Result<Decimal, AppError> {
    let mut subtotal = Decimal::ZERO;
    for line in lines {
        let value = stock::line_total(line.quantity, line.unit_price, line.discount)?;
        subtotal = subtotal.checked_add(value).ok_or_else(stock::amount_overflow)?;
    }
    let total = subtotal.checked_sub(discount).ok_or_else(stock::amount_overflow)?;
    if total < Decimal::ZERO {
        return Err(AppError::NegativeTotal);
    }
    if total > MAX_MONEY {
        return Err(stock::amount_overflow());
    }
    Ok(total)
}

#[derive(Clone)]
pub struct SaleService {
    sale_repo: SaleRepository,
    part_repo: PartRepository,
    customer_repo: CustomerRepository,
    catalog_repo: CatalogRepository,
    exchange_repo: ExchangeRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl SaleService {
    pub fn new(
        sale_repo: SaleRepository,
        part_repo: PartRepository,
        customer_repo: CustomerRepository,
        catalog_repo: CatalogRepository,
        exchange_repo: ExchangeRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self { sale_repo, part_repo, customer_repo, catalog_repo, exchange_repo, audit_repo, pool }
    }

    pub async fn list_sales(&self, filter: &SaleFilter) -> Result<Vec<Sale>, AppError> {
        self.sale_repo.list(filter).await
    }

    pub async fn find_sale(&self, id: Uuid) -> Result<SaleDetail, AppError> {
        let header = found(self.sale_repo.find(&self.pool, id).await?, "Venda")?;
        let items = self.sale_repo.list_items(&self.pool, id).await?;
        Ok(SaleDetail { header, items })
    }

    /// Cria a venda como `pendente`. O estoque é conferido, mas só baixa na finalização.
    pub async fn create_sale(&self, actor: &Actor, input: NewSale) -> Result<SaleDetail, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        let customer = self.customer_repo.find(&mut *tx, input.customer_id).await?;
        active(customer, "Cliente", |c| c.is_active)?;
        let method = self
            .catalog_repo
            .find(&mut *tx, CatalogKind::PaymentMethod, input.payment_method_id)
            .await?;
        active(method, CatalogKind::PaymentMethod.label(), |m| m.is_active)?;

        let required = stock::aggregate(input.items.iter().map(|i| (i.part_id, i.quantity)))?;
        let parts = stock::lock_parts(&self.part_repo, &mut tx, &required).await?;
        stock::plan_deductions(&required, &parts)?;

        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let part = parts
                .iter()
                .find(|p| p.id == item.part_id)
                .ok_or(AppError::NotFound("Peça"))?;
            let unit_price = item.unit_price.unwrap_or(part.sale_price);
            if !is_valid_money(&unit_price) {
                return Err(AppError::BusinessRule(format!("Preço unitário inválido: {unit_price}.")));
            }
            lines.push(PricedLine {
                part_id: item.part_id,
                quantity: item.quantity,
                unit_price,
                discount: item.discount,
            });
        }
        let total = sale_total(&lines, input.discount)?;

        let header = self
            .sale_repo
            .create_header(
                &mut *tx,
                input.customer_id,
                actor.user_id,
                input.payment_method_id,
                input.discount,
                total,
                input.notes.as_deref(),
            )
            .await?;
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = self
                .sale_repo
                .add_item(&mut *tx, header.id, line.part_id, line.quantity, line.unit_price, line.discount)
                .await?;
            items.push(item);
        }

        let detail = SaleDetail { header, items };
        let entry = AuditEntry::new(
            AuditAction::Create,
            SALES,
            detail.header.id,
            format!("Venda criada com {} item(ns), total {}", detail.items.len(), total),
        )
        .after(&detail);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Venda {} criada (total {})", detail.header.id, total);
        Ok(detail)
    }

    /// Baixa o estoque de todos os itens e conclui a venda. Tudo ou nada.
    pub async fn finalize_sale(&self, actor: &Actor, id: Uuid) -> Result<Sale, AppError> {
        let mut tx = self.pool.begin().await?;

        let before = found(self.sale_repo.lock(&mut *tx, id).await?, "Venda")?;
        before.status.ensure_transition(SaleStatus::Concluida)?;

        let items = self.sale_repo.list_items(&mut *tx, id).await?;
        let required = stock::aggregate(items.iter().map(|i| (i.part_id, i.quantity)))?;
        let parts = stock::lock_parts(&self.part_repo, &mut tx, &required).await?;
        let plan = match stock::plan_deductions(&required, &parts) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Venda {} não pôde ser finalizada: {}", id, e);
                return Err(e);
            }
        };
        stock::apply(&self.part_repo, &mut tx, &plan).await?;

        let after = self.sale_repo.update_status(&mut *tx, id, SaleStatus::Concluida).await?;
        let entry = AuditEntry::new(
            AuditAction::Finalize,
            SALES,
            id,
            format!("Venda finalizada, {} peça(s) baixada(s) do estoque", plan.len()),
        )
        .before(&before)
        .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Venda {} finalizada", id);
        Ok(after)
    }

    /// Cancela a venda. Se já estava concluída, devolve as quantidades ao estoque.
    pub async fn cancel_sale(&self, actor: &Actor, id: Uuid) -> Result<Sale, AppError> {
        let mut tx = self.pool.begin().await?;

        let before = found(self.sale_repo.lock(&mut *tx, id).await?, "Venda")?;
        before.status.ensure_transition(SaleStatus::Cancelada)?;

        if self.exchange_repo.count_open_for_sale(&mut *tx, id).await? > 0 {
            return Err(AppError::BusinessRule(
                "A venda possui trocas pendentes ou aprovadas; cancele-as primeiro.".into(),
            ));
        }

        let mut restored = 0;
        if before.status == SaleStatus::Concluida {
            let items = self.sale_repo.list_items(&mut *tx, id).await?;
            let returned = stock::aggregate(items.iter().map(|i| (i.part_id, i.quantity)))?;
            let parts = stock::lock_parts(&self.part_repo, &mut tx, &returned).await?;
            let plan = stock::plan_restorations(&returned, &parts)?;
            stock::apply(&self.part_repo, &mut tx, &plan).await?;
            restored = plan.len();
        }

        let after = self.sale_repo.update_status(&mut *tx, id, SaleStatus::Cancelada).await?;
        let details = if restored > 0 {
            format!("Venda cancelada, estoque de {restored} peça(s) restaurado")
        } else {
            "Venda pendente cancelada".to_string()
        };
        let entry = AuditEntry::new(AuditAction::Cancel, SALES, id, details)
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Venda {} cancelada (status anterior: {})", id, before.status);
        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, price: i64, discount: i64) -> PricedLine {
        PricedLine {
            part_id: Uuid::new_v4(),
            quantity,
            unit_price: Decimal::new(price, 2),
            discount: Decimal::new(discount, 2),
        }
    }

    #[test]
    fn total_subtracts_item_and_sale_discounts() {
        // 2 x 50,00 - 5,00 + 1 x 30,00 - 0 = 125,00; menos 10,00 de desconto geral.
        let lines = [line(2, 5000, 500), line(1, 3000, 0)];
        let total = sale_total(&lines, Decimal::new(1000, 2)).unwrap();
        assert_eq!(total, Decimal::new(11500, 2));
    }

    #[test]
    fn total_may_be_exactly_zero() {
        let lines = [line(1, 2000, 0)];
        assert_eq!(sale_total(&lines, Decimal::new(2000, 2)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn negative_total_is_rejected() {
        let lines = [line(1, 2000, 0)];
        assert!(matches!(
            sale_total(&lines, Decimal::new(2001, 2)),
            Err(AppError::NegativeTotal)
        ));
    }

    #[test]
    fn item_discount_larger_than_item_is_rejected() {
        let lines = [line(1, 1000, 1500), line(3, 1000, 0)];
        assert!(matches!(sale_total(&lines, Decimal::ZERO), Err(AppError::BusinessRule(_))));
    }

    #[test]
    fn total_outside_the_money_column_is_rejected() {
        // Cada linha cabe, mas a soma passa de 9999999999,99.
        let lines = [line(1, 999_999_999_999, 0), line(1, 1, 0)];
        assert!(matches!(sale_total(&lines, Decimal::ZERO), Err(AppError::BusinessRule(_))));

        let huge = PricedLine { unit_price: Decimal::MAX, ..line(2, 0, 0) };
        assert!(matches!(sale_total(&[huge], Decimal::ZERO), Err(AppError::BusinessRule(_))));
    }
}

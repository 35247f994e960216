// src/services/exchange_service.rs

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, status::StatusMachine, validation::MAX_MONEY},
    db::{exchange_repo::EXCHANGES, AuditRepository, ExchangeRepository, PartRepository, SaleRepository},
    models::{
        audit::{Actor, AuditAction, AuditEntry},
        exchange::{Exchange, ExchangeFilter, ExchangeStatus, NewExchange},
        sale::{SaleItem, SaleStatus},
    },
    services::{active, found, stock},
};

/// Quantidade vendida de uma peça e o preço líquido médio por unidade
/// (descontos de item já abatidos).
pub fn sold_summary(items: &[SaleItem], part_id: Uuid) -> Result<Option<(i64, Decimal)>, AppError> {
    let mut quantity = 0i64;
    let mut net = Decimal::ZERO;
    for item in items.iter().filter(|i| i.part_id == part_id) {
        quantity += i64::from(item.quantity);
        let value = stock::line_total(item.quantity, item.unit_price, item.discount)?;
        net = net.checked_add(value).ok_or_else(stock::amount_overflow)?;
    }
    if quantity == 0 {
        return Ok(None);
    }
    let unit = net
        .checked_div(Decimal::from(quantity))
        .ok_or_else(stock::amount_overflow)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Ok(Some((quantity, unit)))
}

/// Positivo: o cliente paga. Negativo: a loja devolve.
pub fn price_difference(
    replacement_price: Decimal,
    replacement_quantity: i32,
    sold_unit_price: Decimal,
    returned_quantity: i32,
) -> Result<Decimal, AppError> {
    let charged = Decimal::from(replacement_quantity)
        .checked_mul(replacement_price)
        .ok_or_else(stock::amount_overflow)?;
    let credited = Decimal::from(returned_quantity)
        .checked_mul(sold_unit_price)
        .ok_or_else(stock::amount_overflow)?;
    let difference = charged.checked_sub(credited).ok_or_else(stock::amount_overflow)?;
    if difference.abs() > MAX_MONEY {
        return Err(stock::amount_overflow());
    }
    Ok(difference)
}

/// Movimento de estoque da troca: a peça devolvida entra, a substituta sai.
/// `reverse` desfaz uma troca aprovada.
fn exchange_deltas(exchange: &Exchange, reverse: bool) -> BTreeMap<Uuid, i32> {
    let sign = if reverse { -1 } else { 1 };
    let mut deltas = BTreeMap::new();
    *deltas.entry(exchange.returned_part_id).or_insert(0) += sign * exchange.returned_quantity;
    *deltas.entry(exchange.replacement_part_id).or_insert(0) -= sign * exchange.replacement_quantity;
    deltas
}

#[derive(Clone)]
pub struct ExchangeService {
    exchange_repo: ExchangeRepository,
    sale_repo: SaleRepository,
    part_repo: PartRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl ExchangeService {
    pub fn new(
        exchange_repo: ExchangeRepository,
        sale_repo: SaleRepository,
        part_repo: PartRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self { exchange_repo, sale_repo, part_repo, audit_repo, pool }
    }

    pub async fn list_exchanges(&self, filter: &ExchangeFilter) -> Result<Vec<Exchange>, AppError> {
        self.exchange_repo.list(filter).await
    }

    pub async fn find_exchange(&self, id: Uuid) -> Result<Exchange, AppError> {
        found(self.exchange_repo.find(&self.pool, id).await?, "Troca")
    }

    /// Registra o pedido de troca. O estoque só muda na aprovação.
    pub async fn create_exchange(&self, actor: &Actor, input: NewExchange) -> Result<Exchange, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        // O lock na venda serializa pedidos de troca concorrentes da mesma venda.
        let sale = found(self.sale_repo.lock(&mut *tx, input.sale_id).await?, "Venda")?;
        if sale.status != SaleStatus::Concluida {
            return Err(AppError::BusinessRule(format!(
                "Só é possível trocar peças de vendas concluídas (status atual: {}).",
                sale.status
            )));
        }

        let items = self.sale_repo.list_items(&mut *tx, sale.id).await?;
        let (sold, sold_unit_price) = sold_summary(&items, input.returned_part_id)?.ok_or_else(|| {
            AppError::BusinessRule("A peça devolvida não faz parte desta venda.".into())
        })?;
        let in_use = self
            .exchange_repo
            .returned_quantity_in_use(&mut *tx, sale.id, input.returned_part_id)
            .await?;
        let available = sold - in_use;
        if i64::from(input.returned_quantity) > available {
            return Err(AppError::BusinessRule(format!(
                "Quantidade devolvida ({}) maior que a disponível para troca ({}).",
                input.returned_quantity,
                available.max(0)
            )));
        }

        let replacement = self.part_repo.find(&mut *tx, input.replacement_part_id).await?;
        let replacement = active(replacement, "Peça", |p| p.is_active)?;

        let difference = price_difference(
            replacement.sale_price,
            input.replacement_quantity,
            sold_unit_price,
            input.returned_quantity,
        )?;
        let exchange = self
            .exchange_repo
            .create(&mut *tx, &input, sale.customer_id, difference, actor.user_id)
            .await?;
        let entry = AuditEntry::new(
            AuditAction::Create,
            EXCHANGES,
            exchange.id,
            format!("Troca solicitada na venda {} (diferença {})", sale.id, difference),
        )
        .after(&exchange);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Troca {} solicitada para a venda {}", exchange.id, sale.id);
        Ok(exchange)
    }

    /// Aprova: a devolvida volta ao estoque e a substituta sai. Uma única vez.
    pub async fn approve_exchange(&self, actor: &Actor, id: Uuid) -> Result<Exchange, AppError> {
        let mut tx = self.pool.begin().await?;

        let before = found(self.exchange_repo.lock(&mut *tx, id).await?, "Troca")?;
        before.status.ensure_transition(ExchangeStatus::Aprovada)?;

        let deltas = exchange_deltas(&before, false);
        let parts = stock::lock_parts(&self.part_repo, &mut tx, &deltas).await?;
        let plan = match stock::plan_net(&deltas, &parts, true) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!("Troca {} não pôde ser aprovada: {}", id, e);
                return Err(e);
            }
        };
        stock::apply(&self.part_repo, &mut tx, &plan).await?;

        let after = self
            .exchange_repo
            .update_status(&mut *tx, id, ExchangeStatus::Aprovada, actor.user_id)
            .await?;
        let entry = AuditEntry::new(AuditAction::Approve, EXCHANGES, id, "Troca aprovada e estoque ajustado")
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Troca {} aprovada", id);
        Ok(after)
    }

    pub async fn reject_exchange(&self, actor: &Actor, id: Uuid) -> Result<Exchange, AppError> {
        let mut tx = self.pool.begin().await?;

        let before = found(self.exchange_repo.lock(&mut *tx, id).await?, "Troca")?;
        before.status.ensure_transition(ExchangeStatus::Rejeitada)?;

        let after = self
            .exchange_repo
            .update_status(&mut *tx, id, ExchangeStatus::Rejeitada, actor.user_id)
            .await?;
        let entry = AuditEntry::new(AuditAction::Reject, EXCHANGES, id, "Troca rejeitada")
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Troca {} rejeitada", id);
        Ok(after)
    }

    /// Cancela. Uma troca já aprovada tem o movimento de estoque desfeito.
    pub async fn cancel_exchange(&self, actor: &Actor, id: Uuid) -> Result<Exchange, AppError> {
        let mut tx = self.pool.begin().await?;

        let before = found(self.exchange_repo.lock(&mut *tx, id).await?, "Troca")?;
        before.status.ensure_transition(ExchangeStatus::Cancelada)?;

        if before.status == ExchangeStatus::Aprovada {
            let deltas = exchange_deltas(&before, true);
            let parts = stock::lock_parts(&self.part_repo, &mut tx, &deltas).await?;
            let plan = stock::plan_net(&deltas, &parts, false)?;
            stock::apply(&self.part_repo, &mut tx, &plan).await?;
        }

        let after = self
            .exchange_repo
            .update_status(&mut *tx, id, ExchangeStatus::Cancelada, actor.user_id)
            .await?;
        let entry = AuditEntry::new(AuditAction::Cancel, EXCHANGES, id, "Troca cancelada")
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Troca {} cancelada (status anterior: {})", id, before.status);
        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(part_id: Uuid, quantity: i32, price: i64, discount: i64) -> SaleItem {
        SaleItem {
            id: Uuid::new_v4(),
            sale_id: Uuid::nil(),
            part_id,
            quantity,
            unit_price: Decimal::new(price, 2),
            discount: Decimal::new(discount, 2),
            created_at: Utc::now(),
        }
    }

    fn exchange(returned: Uuid, rq: i32, replacement: Uuid, pq: i32) -> Exchange {
        Exchange {
            id: Uuid::new_v4(),
            sale_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            returned_part_id: returned,
            returned_quantity: rq,
            replacement_part_id: replacement,
            replacement_quantity: pq,
            price_difference: Decimal::ZERO,
            reason: "defeito".into(),
            status: ExchangeStatus::Pendente,
            requested_by: Uuid::new_v4(),
            decided_by: None,
            decided_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn sold_summary_sums_lines_of_the_part() {
        let part = Uuid::new_v4();
        let other = Uuid::new_v4();
        // 2 x 10,00 - 2,00 + 1 x 10,00 = 28,00 por 3 unidades.
        let items = [item(part, 2, 1000, 200), item(other, 5, 100, 0), item(part, 1, 1000, 0)];
        let (qty, unit) = sold_summary(&items, part).unwrap().unwrap();
        assert_eq!(qty, 3);
        assert_eq!(unit, Decimal::new(933, 2));
        assert!(sold_summary(&items, Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn sold_summary_does_not_overflow_on_many_large_lines() {
        let part = Uuid::new_v4();
        let items = [item(part, i32::MAX, 100, 0), item(part, i32::MAX, 100, 0)];
        let (qty, unit) = sold_summary(&items, part).unwrap().unwrap();
        assert_eq!(qty, 2 * i64::from(i32::MAX));
        assert_eq!(unit, Decimal::new(100, 2));
    }

    #[test]
    fn difference_is_replacement_minus_returned_value() {
        let diff = price_difference(Decimal::new(15000, 2), 1, Decimal::new(12000, 2), 1).unwrap();
        assert_eq!(diff, Decimal::new(3000, 2));
        let refund = price_difference(Decimal::new(5000, 2), 1, Decimal::new(8000, 2), 1).unwrap();
        assert_eq!(refund, Decimal::new(-3000, 2));
    }

    #[test]
    fn difference_too_large_for_the_column_is_rejected() {
        assert!(matches!(
            price_difference(Decimal::MAX, 2, Decimal::ZERO, 1),
            Err(AppError::BusinessRule(_))
        ));
        assert!(matches!(
            price_difference(Decimal::new(999_999_999_999, 2), 2, Decimal::ZERO, 1),
            Err(AppError::BusinessRule(_))
        ));
    }

    #[test]
    fn approval_moves_stock_in_opposite_directions() {
        let returned = Uuid::new_v4();
        let replacement = Uuid::new_v4();
        let ex = exchange(returned, 1, replacement, 2);
        let deltas = exchange_deltas(&ex, false);
        assert_eq!(deltas[&returned], 1);
        assert_eq!(deltas[&replacement], -2);

        let undo = exchange_deltas(&ex, true);
        assert_eq!(undo[&returned], -1);
        assert_eq!(undo[&replacement], 2);
    }

    #[test]
    fn same_part_exchange_nets_out() {
        let part = Uuid::new_v4();
        let deltas = exchange_deltas(&exchange(part, 1, part, 1), false);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[&part], 0);
    }
}

// src/services/purchase_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, status::StatusMachine, validation::MAX_MONEY},
    db::{purchase_repo::PURCHASES, AuditRepository, PartRepository, PurchaseRepository, SupplierRepository},
    models::{
        audit::{Actor, AuditAction, AuditEntry},
        purchase::{NewPurchase, NewPurchaseItem, Purchase, PurchaseDetail, PurchaseFilter, PurchaseStatus},
    },
    services::{active, found, stock},
};

/// `Σ qtd·custo`, recusando o que não cabe na coluna do total.
pub fn purchase_total(items: &[NewPurchaseItem]) -> Result<Decimal, AppError> {
    let mut total = Decimal::ZERO;
    for item in items {
        let value = stock::line_total(item.quantity, item.unit_cost, Decimal::ZERO)?;
        total = total.checked_add(value).ok_or_else(stock::amount_overflow)?;
    }
    if total > MAX_MONEY {
        return Err(stock::amount_overflow());
    }
    Ok(total)
}

#[derive(Clone)]
pub struct PurchaseService {
    purchase_repo: PurchaseRepository,
    part_repo: PartRepository,
    supplier_repo: SupplierRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl PurchaseService {
    pub fn new(
        purchase_repo: PurchaseRepository,
        part_repo: PartRepository,
        supplier_repo: SupplierRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self { purchase_repo, part_repo, supplier_repo, audit_repo, pool }
    }

    pub async fn list_purchases(&self, filter: &PurchaseFilter) -> Result<Vec<Purchase>, AppError> {
        self.purchase_repo.list(filter).await
    }

    pub async fn find_purchase(&self, id: Uuid) -> Result<PurchaseDetail, AppError> {
        let header = found(self.purchase_repo.find(&self.pool, id).await?, "Compra")?;
        let items = self.purchase_repo.list_items(&self.pool, id).await?;
        Ok(PurchaseDetail { header, items })
    }

    pub async fn create_purchase(&self, actor: &Actor, input: NewPurchase) -> Result<PurchaseDetail, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;
        let supplier = self.supplier_repo.find(&mut *tx, input.supplier_id).await?;
        active(supplier, "Fornecedor", |s| s.is_active)?;

        for item in &input.items {
            let part = self.part_repo.find(&mut *tx, item.part_id).await?;
            active(part, "Peça", |p| p.is_active)?;
        }

        let total = purchase_total(&input.items)?;
        let header = self
            .purchase_repo
            .create_header(&mut *tx, input.supplier_id, actor.user_id, total, input.notes.as_deref())
            .await?;
        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let row = self
                .purchase_repo
                .add_item(&mut *tx, header.id, item.part_id, item.quantity, item.unit_cost)
                .await?;
            items.push(row);
        }

        let detail = PurchaseDetail { header, items };
        let entry = AuditEntry::new(
            AuditAction::Create,
            PURCHASES,
            detail.header.id,
            format!("Compra criada com {} item(ns), total {}", detail.items.len(), total),
        )
        .after(&detail);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Compra {} criada (total {})", detail.header.id, total);
        Ok(detail)
    }

    /// Dá entrada no estoque e atualiza o preço de custo de cada peça.
    pub async fn receive_purchase(&self, actor: &Actor, id: Uuid) -> Result<Purchase, AppError> {
        let mut tx = self.pool.begin().await?;

        let before = found(self.purchase_repo.lock(&mut *tx, id).await?, "Compra")?;
        before.status.ensure_transition(PurchaseStatus::Recebida)?;

        let items = self.purchase_repo.list_items(&mut *tx, id).await?;
        let received = stock::aggregate(items.iter().map(|i| (i.part_id, i.quantity)))?;
        let parts = stock::lock_parts(&self.part_repo, &mut tx, &received).await?;
        let plan = stock::plan_restorations(&received, &parts)?;
        stock::apply(&self.part_repo, &mut tx, &plan).await?;

        // Com a mesma peça em várias linhas, vale o custo da última.
        for item in &items {
            self.part_repo.set_cost_price(&mut *tx, item.part_id, item.unit_cost).await?;
        }

        let after = self.purchase_repo.update_status(&mut *tx, id, PurchaseStatus::Recebida).await?;
        let entry = AuditEntry::new(
            AuditAction::Receive,
            PURCHASES,
            id,
            format!("Compra recebida, entrada de {} peça(s) no estoque", plan.len()),
        )
        .before(&before)
        .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Compra {} recebida", id);
        Ok(after)
    }

    /// Cancela a compra. Se já foi recebida, retira do estoque o que entrou.
    pub async fn cancel_purchase(&self, actor: &Actor, id: Uuid) -> Result<Purchase, AppError> {
        let mut tx = self.pool.begin().await?;

        let before = found(self.purchase_repo.lock(&mut *tx, id).await?, "Compra")?;
        before.status.ensure_transition(PurchaseStatus::Cancelada)?;

        if before.status == PurchaseStatus::Recebida {
            let items = self.purchase_repo.list_items(&mut *tx, id).await?;
            let received = stock::aggregate(items.iter().map(|i| (i.part_id, i.quantity)))?;
            let parts = stock::lock_parts(&self.part_repo, &mut tx, &received).await?;
            let plan = match stock::plan_reversals(&received, &parts) {
                Ok(plan) => plan,
                Err(e) => {
                    tracing::warn!("Compra {} não pôde ser cancelada: {}", id, e);
                    return Err(e);
                }
            };
            stock::apply(&self.part_repo, &mut tx, &plan).await?;
        }

        let after = self.purchase_repo.update_status(&mut *tx, id, PurchaseStatus::Cancelada).await?;
        let entry = AuditEntry::new(AuditAction::Cancel, PURCHASES, id, "Compra cancelada")
            .before(&before)
            .after(&after);
        self.audit_repo.insert(&mut *tx, actor, &entry).await?;
        tx.commit().await?;

        tracing::info!("Compra {} cancelada (status anterior: {})", id, before.status);
        Ok(after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_quantity_times_cost() {
        let items = vec![
            NewPurchaseItem { part_id: Uuid::new_v4(), quantity: 10, unit_cost: Decimal::new(1250, 2) },
            NewPurchaseItem { part_id: Uuid::new_v4(), quantity: 2, unit_cost: Decimal::new(9990, 2) },
        ];
        assert_eq!(purchase_total(&items).unwrap(), Decimal::new(32480, 2));
        assert_eq!(purchase_total(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn oversized_total_is_an_error() {
        let item = |quantity, unit_cost| NewPurchaseItem { part_id: Uuid::new_v4(), quantity, unit_cost };
        let items = vec![item(3, Decimal::MAX / Decimal::TWO)];
        assert!(matches!(purchase_total(&items), Err(AppError::BusinessRule(_))));

        let items = vec![item(100_000, Decimal::new(999_999_999_999, 2))];
        assert!(matches!(purchase_total(&items), Err(AppError::BusinessRule(_))));
    }
}

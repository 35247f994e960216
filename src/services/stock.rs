// src/services/stock.rs
//
// Planejamento das movimentações de estoque. Toda operação que mexe em estoque
// (venda, compra, troca) segue o mesmo roteiro dentro de uma transação:
//   1. agrega as quantidades por peça;
//   2. bloqueia as peças (ordem do id);
//   3. planeja todos os deltas contra as linhas bloqueadas;
//   4. só então aplica. Se um item falha, nada foi aplicado.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PartRepository,
    models::part::Part,
};

/// Variação de estoque planejada para uma peça.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub part_id: Uuid,
    pub delta: i32,
}

/// Soma as quantidades de linhas da mesma peça. `BTreeMap` mantém a ordem do id,
/// a mesma usada no `FOR UPDATE`. Uma soma que não cabe em `i32` é recusada.
pub fn aggregate<I>(lines: I) -> Result<BTreeMap<Uuid, i32>, AppError>
where
    I: IntoIterator<Item = (Uuid, i32)>,
{
    let mut totals = BTreeMap::new();
    for (part_id, quantity) in lines {
        let total = totals.entry(part_id).or_insert(0i32);
        *total = total.checked_add(quantity).ok_or_else(|| {
            AppError::BusinessRule(format!("Quantidade total da peça {part_id} excede o limite permitido."))
        })?;
    }
    Ok(totals)
}

/// Erro para contas de dinheiro que estouram a faixa do `Decimal`.
pub(crate) fn amount_overflow() -> AppError {
    AppError::BusinessRule("Valor fora do intervalo permitido.".into())
}

fn locked<'a>(parts: &'a [Part], id: &Uuid) -> Result<&'a Part, AppError> {
    parts.iter().find(|p| p.id == *id).ok_or(AppError::NotFound("Peça"))
}

/// Baixas de estoque: cada peça precisa existir, estar ativa e ter saldo.
pub fn plan_deductions(required: &BTreeMap<Uuid, i32>, parts: &[Part]) -> Result<Vec<StockChange>, AppError> {
    required
        .iter()
        .map(|(id, &quantity)| {
            let part = locked(parts, id)?;
            if !part.is_active {
                return Err(AppError::Inactive("Peça"));
            }
            if part.stock_quantity < quantity {
                return Err(AppError::InsufficientStock {
                    part: part.name.clone(),
                    available: part.stock_quantity,
                    requested: quantity,
                });
            }
            Ok(StockChange { part_id: *id, delta: -quantity })
        })
        .collect()
}

/// Devoluções ao estoque. Peça inativa ainda recebe o saldo de volta.
pub fn plan_restorations(returned: &BTreeMap<Uuid, i32>, parts: &[Part]) -> Result<Vec<StockChange>, AppError> {
    returned
        .iter()
        .map(|(id, &quantity)| {
            locked(parts, id)?;
            Ok(StockChange { part_id: *id, delta: quantity })
        })
        .collect()
}

/// Estorno de entrada (compra cancelada): como uma baixa, mas sem exigir peça ativa.
pub fn plan_reversals(received: &BTreeMap<Uuid, i32>, parts: &[Part]) -> Result<Vec<StockChange>, AppError> {
    received
        .iter()
        .map(|(id, &quantity)| {
            let part = locked(parts, id)?;
            if part.stock_quantity < quantity {
                return Err(AppError::InsufficientStock {
                    part: part.name.clone(),
                    available: part.stock_quantity,
                    requested: quantity,
                });
            }
            Ok(StockChange { part_id: *id, delta: -quantity })
        })
        .collect()
}

/// Deltas com sinal (entrada e saída misturadas, como numa troca).
/// Saídas conferem saldo; `require_active` também exige peça ativa nas saídas.
pub fn plan_net(deltas: &BTreeMap<Uuid, i32>, parts: &[Part], require_active: bool) -> Result<Vec<StockChange>, AppError> {
    let mut plan = Vec::with_capacity(deltas.len());
    for (id, &delta) in deltas {
        let part = locked(parts, id)?;
        if delta < 0 {
            if require_active && !part.is_active {
                return Err(AppError::Inactive("Peça"));
            }
            if part.stock_quantity < -delta {
                return Err(AppError::InsufficientStock {
                    part: part.name.clone(),
                    available: part.stock_quantity,
                    requested: -delta,
                });
            }
        }
        if delta != 0 {
            plan.push(StockChange { part_id: *id, delta });
        }
    }
    Ok(plan)
}

/// Bloqueia as peças e devolve as linhas, na ordem do id.
pub(crate) async fn lock_parts(
    repo: &PartRepository,
    conn: &mut PgConnection,
    required: &BTreeMap<Uuid, i32>,
) -> Result<Vec<Part>, AppError> {
    let ids: Vec<Uuid> = required.keys().copied().collect();
    repo.lock_many(&mut *conn, &ids).await
}

/// Aplica um plano já validado. O `UPDATE` guardado ainda recusa saldo negativo;
/// se isso acontecer a transação inteira é abortada pelo chamador.
pub(crate) async fn apply(
    repo: &PartRepository,
    conn: &mut PgConnection,
    changes: &[StockChange],
) -> Result<Vec<Part>, AppError> {
    let mut updated = Vec::with_capacity(changes.len());
    for change in changes {
        let part = repo
            .apply_stock_delta(&mut *conn, change.part_id, change.delta)
            .await?
            .ok_or_else(|| AppError::InsufficientStock {
                part: change.part_id.to_string(),
                available: 0,
                requested: -change.delta,
            })?;
        if part.is_below_minimum() {
            tracing::warn!(
                "Peça '{}' no estoque mínimo ({} <= {})",
                part.name,
                part.stock_quantity,
                part.minimum_stock
            );
        }
        updated.push(part);
    }
    Ok(updated)
}

/// Valor de uma linha com desconto. O desconto não pode passar do bruto.
pub fn line_total(quantity: i32, unit_price: Decimal, discount: Decimal) -> Result<Decimal, AppError> {
    let gross = Decimal::from(quantity).checked_mul(unit_price).ok_or_else(amount_overflow)?;
    if discount > gross {
        return Err(AppError::BusinessRule(format!(
            "O desconto do item ({discount}) é maior que o valor do item ({gross})"
        )));
    }
    gross.checked_sub(discount).ok_or_else(amount_overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::part::PartCondition;
    use chrono::Utc;

    fn part(name: &str, stock: i32, active: bool) -> Part {
        Part {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            category_id: None,
            brand_id: None,
            sale_price: Decimal::new(1000, 2),
            cost_price: Decimal::new(500, 2),
            stock_quantity: stock,
            minimum_stock: 1,
            condition: PartCondition::Novo,
            code: None,
            location: None,
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn repeated_part_lines_are_summed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let totals = aggregate([(a, 2), (b, 1), (a, 3)]).unwrap();
        assert_eq!(totals[&a], 5);
        assert_eq!(totals[&b], 1);
    }

    #[test]
    fn deduction_checks_the_aggregated_quantity() {
        let filtro = part("Filtro", 4, true);
        // 3 + 2 = 5 > 4, mesmo que cada linha isolada caiba no estoque.
        let required = aggregate([(filtro.id, 3), (filtro.id, 2)]).unwrap();
        let err = plan_deductions(&required, std::slice::from_ref(&filtro)).unwrap_err();
        match err {
            AppError::InsufficientStock { part, available, requested } => {
                assert_eq!(part, "Filtro");
                assert_eq!(available, 4);
                assert_eq!(requested, 5);
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn deduction_plans_every_line_when_stock_is_enough() {
        let vela = part("Vela", 10, true);
        let cabo = part("Cabo", 2, true);
        let required = aggregate([(vela.id, 4), (cabo.id, 2)]).unwrap();
        let plan = plan_deductions(&required, &[vela.clone(), cabo.clone()]).unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan.contains(&StockChange { part_id: vela.id, delta: -4 }));
        assert!(plan.contains(&StockChange { part_id: cabo.id, delta: -2 }));
    }

    #[test]
    fn missing_or_inactive_parts_are_rejected() {
        let inactive = part("Correia", 10, false);
        let required = aggregate([(inactive.id, 1)]).unwrap();
        assert!(matches!(
            plan_deductions(&required, std::slice::from_ref(&inactive)),
            Err(AppError::Inactive("Peça"))
        ));

        let required = aggregate([(Uuid::new_v4(), 1)]).unwrap();
        assert!(matches!(plan_deductions(&required, &[]), Err(AppError::NotFound("Peça"))));
    }

    #[test]
    fn restoration_accepts_inactive_parts() {
        let inactive = part("Correia", 0, false);
        let returned = aggregate([(inactive.id, 3)]).unwrap();
        let plan = plan_restorations(&returned, std::slice::from_ref(&inactive)).unwrap();
        assert_eq!(plan, vec![StockChange { part_id: inactive.id, delta: 3 }]);
    }

    #[test]
    fn reversal_fails_when_received_stock_was_already_sold() {
        let pneu = part("Pneu", 1, false);
        let received = aggregate([(pneu.id, 4)]).unwrap();
        assert!(matches!(
            plan_reversals(&received, std::slice::from_ref(&pneu)),
            Err(AppError::InsufficientStock { available: 1, requested: 4, .. })
        ));
    }

    #[test]
    fn net_plan_mixes_entries_and_exits() {
        let returned = part("Bateria", 0, true);
        let replacement = part("Bateria 60Ah", 1, true);
        let deltas = BTreeMap::from([(returned.id, 1), (replacement.id, -1)]);
        let plan = plan_net(&deltas, &[returned.clone(), replacement.clone()], true).unwrap();
        assert_eq!(plan.len(), 2);

        let deltas = BTreeMap::from([(returned.id, 1), (replacement.id, -2)]);
        assert!(matches!(
            plan_net(&deltas, &[returned.clone(), replacement.clone()], true),
            Err(AppError::InsufficientStock { requested: 2, .. })
        ));

        let same = BTreeMap::from([(returned.id, 0)]);
        assert!(plan_net(&same, std::slice::from_ref(&returned), true).unwrap().is_empty());
    }

    #[test]
    fn same_part_lines_that_overflow_are_rejected() {
        let id = Uuid::new_v4();
        assert!(matches!(
            aggregate([(id, i32::MAX), (id, i32::MAX)]),
            Err(AppError::BusinessRule(_))
        ));
        assert_eq!(aggregate([(id, i32::MAX - 1), (id, 1)]).unwrap()[&id], i32::MAX);
    }

    #[test]
    fn huge_prices_fail_instead_of_panicking() {
        let price = Decimal::MAX / Decimal::TWO;
        assert!(matches!(line_total(3, price, Decimal::ZERO), Err(AppError::BusinessRule(_))));
        assert!(line_total(1, price, Decimal::ZERO).is_ok());
    }

    #[test]
    fn line_discount_cannot_exceed_gross_value() {
        assert_eq!(
            line_total(2, Decimal::new(1050, 2), Decimal::new(100, 2)).unwrap(),
            Decimal::new(2000, 2)
        );
        assert!(line_total(1, Decimal::new(500, 2), Decimal::new(501, 2)).is_err());
    }
}

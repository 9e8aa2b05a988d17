//! Branches, parts and payment sources: the master data postings refer to.

use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{Branch, NewPart, NewPaymentSource, Part, PartUpdate, PaymentSource};
use crate::validation::{validate_price, validate_required_text, validate_sku};

pub fn validate_branch(branch: &Branch) -> CoreResult<()> {
    validate_required_text("id", &branch.id, 20)?;
    validate_required_text("name", &branch.name, 200)?;
    Ok(())
}

fn validate_part_fields(
    sku: &str,
    name: &str,
    category: &str,
    cost_price: Money,
    selling_price: Money,
) -> CoreResult<()> {
    validate_sku(sku)?;
    validate_required_text("name", name, 200)?;
    validate_required_text("category", category, 100)?;
    validate_price("cost_price", cost_price)?;
    validate_price("selling_price", selling_price)?;
    Ok(())
}

/// Builds a part with empty stock. Opening stock is posted separately
/// through [`crate::ledger::opening_stock`].
pub fn build_part(draft: &NewPart) -> CoreResult<Part> {
    validate_part_fields(
        &draft.sku,
        &draft.name,
        &draft.category,
        draft.cost_price,
        draft.selling_price,
    )?;

    let now = Utc::now();
    Ok(Part {
        id: Uuid::new_v4().to_string(),
        sku: draft.sku.trim().to_string(),
        name: draft.name.trim().to_string(),
        category: draft.category.trim().to_string(),
        cost_price: draft.cost_price,
        selling_price: draft.selling_price,
        stock: BTreeMap::new(),
        created_at: now,
        updated_at: now,
    })
}

/// Applies catalog edits. Stock is untouched.
pub fn apply_part_update(part: &mut Part, update: PartUpdate) -> CoreResult<()> {
    validate_part_fields(
        &update.sku,
        &update.name,
        &update.category,
        update.cost_price,
        update.selling_price,
    )?;

    part.sku = update.sku.trim().to_string();
    part.name = update.name.trim().to_string();
    part.category = update.category.trim().to_string();
    part.cost_price = update.cost_price;
    part.selling_price = update.selling_price;
    part.updated_at = Utc::now();
    Ok(())
}

/// Builds a payment source with no balance. The opening balance is posted
/// through [`crate::ledger::opening_balance`].
pub fn build_payment_source(draft: &NewPaymentSource) -> CoreResult<PaymentSource> {
    validate_required_text("name", &draft.name, 100)?;

    Ok(PaymentSource {
        id: Uuid::new_v4().to_string(),
        name: draft.name.trim().to_string(),
        balance: BTreeMap::new(),
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use chrono::NaiveDate;

    fn new_part() -> NewPart {
        NewPart {
            sku: " OIL-10W40 ".to_string(),
            name: "Motul 3000 10W40".to_string(),
            category: "Oil".to_string(),
            cost_price: Money::new(90_000),
            selling_price: Money::new(120_000),
            opening_stock: BTreeMap::from([("HN".to_string(), 10)]),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[test]
    fn test_build_part_trims_and_starts_empty() {
        let part = build_part(&new_part()).unwrap();
        assert_eq!(part.sku, "OIL-10W40");
        assert!(part.stock.is_empty());
    }

    #[test]
    fn test_build_part_rejects_negative_price() {
        let mut draft = new_part();
        draft.selling_price = Money::new(-1);
        assert!(matches!(build_part(&draft), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_apply_part_update_keeps_stock() {
        let mut part = build_part(&new_part()).unwrap();
        part.stock.insert("HN".to_string(), 4);
        apply_part_update(
            &mut part,
            PartUpdate {
                sku: "OIL-10W40".to_string(),
                name: "Motul 3100 10W40".to_string(),
                category: "Oil".to_string(),
                cost_price: Money::new(95_000),
                selling_price: Money::new(130_000),
            },
        )
        .unwrap();
        assert_eq!(part.stock_at("HN"), 4);
        assert_eq!(part.selling_price.amount(), 130_000);
    }

    #[test]
    fn test_validate_branch() {
        let ok = Branch {
            id: "HN".to_string(),
            name: "Hà Nội".to_string(),
            address: None,
        };
        assert!(validate_branch(&ok).is_ok());
        let bad = Branch {
            id: " ".to_string(),
            ..ok
        };
        assert!(validate_branch(&bad).is_err());
    }
}

//! # Retail Sales
//!
//! Turns a checkout draft into a [`Sale`] and the ledger rows it posts.
//!
//! ```text
//! SaleDraft ──► build_sale() ──► Sale ──► sale_posting()
//!                                            ├── out × item   (sale_id)
//!                                            └── income total (sale_id)
//! ```

use chrono::Utc;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::ledger::{snapshot_row, PartCatalog, Posting};
use crate::money::Money;
use crate::types::{
    CashCategory, CashFlow, CashTransaction, InventoryDirection, Sale, SaleDraft, SaleItem,
};
use crate::validation::{validate_has_lines, validate_price, validate_quantity};

/// Prices a sale draft against the catalog.
///
/// Lines snapshot sku, name, selling price (unless overridden) and cost
/// price. `total = subtotal − discount`; a discount above the subtotal is
/// rejected.
pub fn build_sale<C>(draft: SaleDraft, catalog: &C) -> CoreResult<Sale>
where
    C: PartCatalog + ?Sized,
{
    validate_has_lines("items", draft.items.len())?;
    validate_price("discount", draft.discount)?;

    let mut items = Vec::with_capacity(draft.items.len());
    for line in &draft.items {
        validate_quantity(line.quantity)?;
        let part = catalog.require_part(&line.part_id)?;
        let unit_price = line.unit_price.unwrap_or(part.selling_price);
        validate_price("unit_price", unit_price)?;

        items.push(SaleItem {
            part_id: part.id.clone(),
            sku: part.sku.clone(),
            part_name: part.name.clone(),
            quantity: line.quantity,
            unit_price,
            cost_price: part.cost_price,
        });
    }

    let subtotal: Money = items.iter().map(SaleItem::line_total).sum();
    if draft.discount > subtotal {
        return Err(CoreError::DiscountExceedsTotal {
            discount: draft.discount.amount(),
            gross: subtotal.amount(),
        });
    }

    Ok(Sale {
        id: Uuid::new_v4().to_string(),
        branch_id: draft.branch_id,
        customer_id: draft.customer_id,
        customer_name: draft.customer_name,
        items,
        subtotal,
        discount: draft.discount,
        total: subtotal - draft.discount,
        payment_source_id: draft.payment_source_id,
        date: draft.date,
        notes: draft.notes,
        created_at: Utc::now(),
    })
}

/// The rows a sale posts: one outbound row per line and one income row
/// for the total (omitted when the total is zero).
pub fn sale_posting(sale: &Sale) -> Posting {
    let mut posting = Posting::new();

    for item in &sale.items {
        let mut row = snapshot_row(
            InventoryDirection::Out,
            (&item.part_id, &item.part_name),
            item.quantity,
            item.unit_price,
            &sale.branch_id,
            sale.date,
            None,
        );
        row.sale_id = Some(sale.id.clone());
        posting.inventory.push(row);
    }

    if sale.total.is_positive() {
        posting.cash.push(CashTransaction {
            id: Uuid::new_v4().to_string(),
            flow: CashFlow::Income,
            category: CashCategory::RetailSale,
            amount: sale.total,
            contact: sale.customer_name.clone(),
            payment_source_id: sale.payment_source_id.clone(),
            branch_id: sale.branch_id.clone(),
            date: sale.date,
            notes: None,
            sale_id: Some(sale.id.clone()),
            receipt_id: None,
            work_order_id: None,
            created_at: Utc::now(),
        });
    }

    posting
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Part, SaleLineDraft};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn catalog() -> Vec<Part> {
        let now = Utc::now();
        vec![
            Part {
                id: "oil".to_string(),
                sku: "OIL-10W40".to_string(),
                name: "Engine oil".to_string(),
                category: "Oil".to_string(),
                cost_price: Money::new(90_000),
                selling_price: Money::new(120_000),
                stock: BTreeMap::new(),
                created_at: now,
                updated_at: now,
            },
            Part {
                id: "plug".to_string(),
                sku: "NGK-CPR8EA".to_string(),
                name: "Spark plug".to_string(),
                category: "Ignition".to_string(),
                cost_price: Money::new(30_000),
                selling_price: Money::new(45_000),
                stock: BTreeMap::new(),
                created_at: now,
                updated_at: now,
            },
        ]
    }

    fn draft(lines: Vec<SaleLineDraft>, discount: i64) -> SaleDraft {
        SaleDraft {
            branch_id: "HN".to_string(),
            customer_id: None,
            customer_name: Some("Anh Tuấn".to_string()),
            items: lines,
            discount: Money::new(discount),
            payment_source_id: "cash".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            notes: None,
        }
    }

    fn line(part_id: &str, quantity: i64) -> SaleLineDraft {
        SaleLineDraft {
            part_id: part_id.to_string(),
            quantity,
            unit_price: None,
        }
    }

    #[test]
    fn test_build_sale_totals() {
        let sale = build_sale(draft(vec![line("oil", 1), line("plug", 2)], 10_000), &catalog())
            .unwrap();

        assert_eq!(sale.subtotal.amount(), 210_000);
        assert_eq!(sale.total.amount(), 200_000);
        assert_eq!(sale.cost().amount(), 150_000);
        assert_eq!(sale.items[1].sku, "NGK-CPR8EA");
    }

    #[test]
    fn test_price_override() {
        let mut l = line("oil", 1);
        l.unit_price = Some(Money::new(100_000));
        let sale = build_sale(draft(vec![l], 0), &catalog()).unwrap();
        assert_eq!(sale.total.amount(), 100_000);
        assert_eq!(sale.items[0].cost_price.amount(), 90_000);
    }

    #[test]
    fn test_empty_and_unknown_lines_rejected() {
        assert!(matches!(
            build_sale(draft(vec![], 0), &catalog()),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            build_sale(draft(vec![line("ghost", 1)], 0), &catalog()),
            Err(CoreError::PartNotFound(_))
        ));
    }

    #[test]
    fn test_price_beyond_ceiling_rejected_before_totals() {
        let mut l = line("oil", 3);
        l.unit_price = Some(Money::new(i64::MAX / 2));
        assert!(matches!(
            build_sale(draft(vec![l], 0), &catalog()),
            Err(CoreError::Validation(
                crate::error::ValidationError::OutOfRange { .. }
            ))
        ));

        let mut l = line("oil", crate::MAX_LINE_QUANTITY);
        l.unit_price = Some(Money::new(crate::MAX_UNIT_PRICE));
        let sale = build_sale(draft(vec![l], 0), &catalog()).unwrap();
        assert_eq!(
            sale.total.amount(),
            crate::MAX_UNIT_PRICE * crate::MAX_LINE_QUANTITY
        );
    }

    #[test]
    fn test_discount_over_subtotal_rejected() {
        let result = build_sale(draft(vec![line("plug", 1)], 50_000), &catalog());
        assert!(matches!(
            result,
            Err(CoreError::DiscountExceedsTotal {
                discount: 50_000,
                gross: 45_000
            })
        ));
    }

    #[test]
    fn test_sale_posting_rows() {
        let sale = build_sale(draft(vec![line("oil", 1), line("plug", 2)], 0), &catalog())
            .unwrap();
        let posting = sale_posting(&sale);

        assert_eq!(posting.inventory.len(), 2);
        assert!(posting
            .inventory
            .iter()
            .all(|tx| tx.sale_id.as_deref() == Some(sale.id.as_str())
                && tx.direction == InventoryDirection::Out));
        assert_eq!(posting.cash.len(), 1);
        assert_eq!(posting.cash[0].balance_delta(), sale.total);
        assert_eq!(posting.cash[0].contact.as_deref(), Some("Anh Tuấn"));
    }

    #[test]
    fn test_free_sale_posts_no_cash() {
        let mut l = line("plug", 1);
        l.unit_price = Some(Money::zero());
        let sale = build_sale(draft(vec![l], 0), &catalog()).unwrap();
        let posting = sale_posting(&sale);
        assert_eq!(posting.inventory.len(), 1);
        assert!(posting.cash.is_empty());
    }
}

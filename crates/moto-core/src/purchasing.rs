//! # Goods Receipts
//!
//! Deliveries from suppliers: stock comes in, and when paid on receipt an
//! expense goes out of the chosen payment source.

use chrono::Utc;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::ledger::{snapshot_row, PartCatalog, Posting};
use crate::money::Money;
use crate::types::{
    CashCategory, CashFlow, CashTransaction, GoodsReceipt, GoodsReceiptDraft, InventoryDirection,
    ReceiptItem,
};
use crate::validation::{validate_has_lines, validate_price, validate_quantity, validate_required_text};

/// Prices a receipt draft against the catalog.
pub fn build_goods_receipt<C>(draft: &GoodsReceiptDraft, catalog: &C) -> CoreResult<GoodsReceipt>
where
    C: PartCatalog + ?Sized,
{
    validate_required_text("supplier", &draft.supplier, 200)?;
    validate_has_lines("items", draft.items.len())?;

    let mut items = Vec::with_capacity(draft.items.len());
    for line in &draft.items {
        validate_quantity(line.quantity)?;
        validate_price("unit_cost", line.unit_cost)?;
        let part = catalog.require_part(&line.part_id)?;
        items.push(ReceiptItem {
            part_id: part.id.clone(),
            part_name: part.name.clone(),
            quantity: line.quantity,
            unit_cost: line.unit_cost,
        });
    }

    let total: Money = items.iter().map(ReceiptItem::line_total).sum();

    Ok(GoodsReceipt {
        id: Uuid::new_v4().to_string(),
        branch_id: draft.branch_id.clone(),
        supplier: draft.supplier.trim().to_string(),
        items,
        total,
        payment_source_id: draft.payment_source_id.clone(),
        date: draft.date,
        notes: draft.notes.clone(),
        created_at: Utc::now(),
    })
}

/// The rows a receipt posts: one inbound row per line, plus an expense for
/// the total when paid.
pub fn goods_receipt_posting(receipt: &GoodsReceipt) -> Posting {
    let mut posting = Posting::new();

    for item in &receipt.items {
        let mut row = snapshot_row(
            InventoryDirection::In,
            (&item.part_id, &item.part_name),
            item.quantity,
            item.unit_cost,
            &receipt.branch_id,
            receipt.date,
            Some(format!("Received from {}", receipt.supplier)),
        );
        row.receipt_id = Some(receipt.id.clone());
        posting.inventory.push(row);
    }

    if let Some(source_id) = &receipt.payment_source_id {
        if receipt.total.is_positive() {
            posting.cash.push(CashTransaction {
                id: Uuid::new_v4().to_string(),
                flow: CashFlow::Expense,
                category: CashCategory::GoodsPurchase,
                amount: receipt.total,
                contact: Some(receipt.supplier.clone()),
                payment_source_id: source_id.clone(),
                branch_id: receipt.branch_id.clone(),
                date: receipt.date,
                notes: receipt.notes.clone(),
                sale_id: None,
                receipt_id: Some(receipt.id.clone()),
                work_order_id: None,
                created_at: Utc::now(),
            });
        }
    }

    posting
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Part, ReceiptLineDraft};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn catalog() -> Vec<Part> {
        let now = Utc::now();
        vec![Part {
            id: "tyre".to_string(),
            sku: "TYRE-80-90-17".to_string(),
            name: "Tyre 80/90-17".to_string(),
            category: "Tyres".to_string(),
            cost_price: Money::new(300_000),
            selling_price: Money::new(420_000),
            stock: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }]
    }

    fn draft(paid: bool) -> GoodsReceiptDraft {
        GoodsReceiptDraft {
            branch_id: "HN".to_string(),
            supplier: " Casumina ".to_string(),
            items: vec![ReceiptLineDraft {
                part_id: "tyre".to_string(),
                quantity: 4,
                unit_cost: Money::new(280_000),
            }],
            payment_source_id: paid.then(|| "bank".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            notes: None,
            update_cost_price: false,
        }
    }

    #[test]
    fn test_paid_receipt_posts_stock_and_expense() {
        let receipt = build_goods_receipt(&draft(true), &catalog()).unwrap();
        assert_eq!(receipt.total.amount(), 1_120_000);
        assert_eq!(receipt.supplier, "Casumina");

        let posting = goods_receipt_posting(&receipt);
        assert_eq!(posting.inventory.len(), 1);
        assert_eq!(posting.inventory[0].stock_delta(), 4);
        assert_eq!(posting.cash.len(), 1);
        assert_eq!(posting.cash[0].balance_delta().amount(), -1_120_000);
        assert_eq!(posting.cash[0].payment_source_id, "bank");
    }

    #[test]
    fn test_unpaid_receipt_posts_stock_only() {
        let receipt = build_goods_receipt(&draft(false), &catalog()).unwrap();
        let posting = goods_receipt_posting(&receipt);
        assert_eq!(posting.inventory.len(), 1);
        assert!(posting.cash.is_empty());
    }

    #[test]
    fn test_supplier_required() {
        let mut d = draft(false);
        d.supplier = "  ".to_string();
        assert!(build_goods_receipt(&d, &catalog()).is_err());
    }
}

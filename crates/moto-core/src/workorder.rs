//! # Work Orders
//!
//! Pricing, status and ledger rows of service tickets.
//!
//! ## Total
//! ```text
//! total = labor_cost
//!       + Σ parts_used.price × quantity
//!       + Σ quotation_items.unit_price × quantity
//!       − discount
//! ```
//!
//! The total is stored on the order and recomputed on every build, so it
//! can never drift from its lines.
//!
//! ## Ledger
//! Parts are issued from stock at the order's branch when the order is
//! saved. Once settled, the total is posted as `service` income on the
//! chosen payment source. Both kinds of row carry `work_order_id` and are
//! re-posted on update and reverted on delete.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::ledger::{snapshot_row, PartCatalog, Posting};
use crate::money::Money;
use crate::types::{
    CashCategory, CashFlow, CashTransaction, InventoryDirection, Part, PartUsage, QuotationItem,
    WorkOrder, WorkOrderDraft, WorkOrderStatus,
};
use crate::validation::{
    validate_line_count, validate_odometer, validate_price, validate_quantity, validate_required_text,
};

/// Labor plus every line, before discount.
pub fn gross_total(labor_cost: Money, parts: &[PartUsage], quotation: &[QuotationItem]) -> Money {
    labor_cost
        + parts.iter().map(PartUsage::line_total).sum::<Money>()
        + quotation.iter().map(QuotationItem::line_total).sum::<Money>()
}

/// The work-order total. Rejects a discount larger than the gross.
pub fn compute_total(
    labor_cost: Money,
    parts: &[PartUsage],
    quotation: &[QuotationItem],
    discount: Money,
) -> CoreResult<Money> {
    let gross = gross_total(labor_cost, parts, quotation);
    if discount > gross {
        return Err(CoreError::DiscountExceedsTotal {
            discount: discount.amount(),
            gross: gross.amount(),
        });
    }
    Ok(gross - discount)
}

/// Builds a new work order, or the replacement for `existing` on update.
///
/// An update keeps the id, creation time and settlement of the existing
/// order. Part lines snapshot name and cost price from the catalog.
pub fn build_work_order<C>(
    draft: WorkOrderDraft,
    catalog: &C,
    existing: Option<&WorkOrder>,
    today: NaiveDate,
) -> CoreResult<WorkOrder>
where
    C: PartCatalog + ?Sized,
{
    validate_required_text("customer_name", &draft.customer_name, 200)?;
    validate_required_text("issue_description", &draft.issue_description, 2000)?;
    validate_price("labor_cost", draft.labor_cost)?;
    validate_price("discount", draft.discount)?;
    validate_line_count("parts", draft.parts.len())?;
    validate_line_count("quotation_items", draft.quotation_items.len())?;
    if let Some(km) = draft.odometer {
        validate_odometer(km)?;
    }

    let mut parts_used = Vec::with_capacity(draft.parts.len());
    for line in &draft.parts {
        validate_quantity(line.quantity)?;
        let part = catalog.require_part(&line.part_id)?;
        let price = line.price.unwrap_or(part.selling_price);
        validate_price("price", price)?;
        parts_used.push(PartUsage {
            part_id: part.id.clone(),
            part_name: part.name.clone(),
            quantity: line.quantity,
            price,
            cost_price: part.cost_price,
        });
    }

    for item in &draft.quotation_items {
        validate_required_text("description", &item.description, 500)?;
        validate_quantity(item.quantity)?;
        validate_price("unit_price", item.unit_price)?;
    }

    let total = compute_total(
        draft.labor_cost,
        &parts_used,
        &draft.quotation_items,
        draft.discount,
    )?;

    let now = Utc::now();
    let mut order = WorkOrder {
        id: existing
            .map(|o| o.id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        branch_id: draft.branch_id,
        customer_id: draft.customer_id,
        customer_name: draft.customer_name.trim().to_string(),
        customer_phone: draft.customer_phone,
        vehicle: draft.vehicle,
        license_plate: draft.license_plate,
        odometer: draft.odometer,
        issue_description: draft.issue_description,
        technician: draft.technician,
        status: existing.map(|o| o.status).unwrap_or_default(),
        parts_used,
        quotation_items: draft.quotation_items,
        labor_cost: draft.labor_cost,
        discount: draft.discount,
        total,
        payment_source_id: existing.and_then(|o| o.payment_source_id.clone()),
        paid_on: existing.and_then(|o| o.paid_on),
        received_on: draft.received_on,
        completed_on: existing.and_then(|o| o.completed_on),
        created_at: existing.map(|o| o.created_at).unwrap_or(now),
        updated_at: now,
    };
    set_status(&mut order, draft.status, today);

    Ok(order)
}

/// Moves an order to `status`.
///
/// Entering done or returned stamps `completed_on` (kept if already set);
/// going back to an open status clears it.
pub fn set_status(order: &mut WorkOrder, status: WorkOrderStatus, today: NaiveDate) {
    if status.is_completed() {
        if order.completed_on.is_none() {
            order.completed_on = Some(today);
        }
    } else {
        order.completed_on = None;
    }
    order.status = status;
    order.updated_at = Utc::now();
}

/// Fails with `PartInUse` when any work order lists the part.
///
/// Orders of every status count: a returned order can still be settled
/// or edited, and both re-post its part lines.
pub fn ensure_part_unused(orders: &[WorkOrder], part: &Part) -> CoreResult<()> {
    match orders
        .iter()
        .find(|o| o.parts_used.iter().any(|u| u.part_id == part.id))
    {
        Some(order) => Err(CoreError::PartInUse {
            sku: part.sku.clone(),
            work_order_id: order.id.clone(),
        }),
        None => Ok(()),
    }
}

/// Records that the customer paid. The income row comes from
/// [`work_order_posting`].
pub fn settle(order: &mut WorkOrder, payment_source_id: &str, paid_on: NaiveDate) {
    order.payment_source_id = Some(payment_source_id.to_string());
    order.paid_on = Some(paid_on);
    order.updated_at = Utc::now();
}

/// The rows a work order posts: one outbound row per part line, plus the
/// service income once settled.
pub fn work_order_posting(order: &WorkOrder) -> Posting {
    let mut posting = Posting::new();

    for usage in &order.parts_used {
        let mut row = snapshot_row(
            InventoryDirection::Out,
            (&usage.part_id, &usage.part_name),
            usage.quantity,
            usage.price,
            &order.branch_id,
            order.received_on,
            Some(format!("Work order for {}", order.customer_name)),
        );
        row.work_order_id = Some(order.id.clone());
        posting.inventory.push(row);
    }

    if let (Some(source_id), Some(paid_on)) = (&order.payment_source_id, order.paid_on) {
        if order.total.is_positive() {
            posting.cash.push(CashTransaction {
                id: Uuid::new_v4().to_string(),
                flow: CashFlow::Income,
                category: CashCategory::Service,
                amount: order.total,
                contact: Some(order.customer_name.clone()),
                payment_source_id: source_id.clone(),
                branch_id: order.branch_id.clone(),
                date: paid_on,
                notes: order.license_plate.clone(),
                sale_id: None,
                receipt_id: None,
                work_order_id: Some(order.id.clone()),
                created_at: Utc::now(),
            });
        }
    }

    posting
}

//! Property-based tests for the stock and cash ledgers.
//!
//! Random sequences of postings, edits and deletes are replayed against a
//! `ShopBook`; recorded stock and balances must always equal the sum of the
//! rows that explain them.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use moto_core::workorder::compute_total;
use moto_core::{
    BookSettings, Branch, CashCategory, CashFlow, InventoryDirection, Money,
    NewCashTransaction, NewInventoryTransaction, NewPart, NewPaymentSource, PartUsageDraft,
    QuotationItem, SaleDraft, SaleLineDraft, ShopBook, TransferRequest, WorkOrderDraft,
    WorkOrderStatus,
};
use proptest::prelude::*;

const BRANCHES: [&str; 2] = ["HN", "HCM"];

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

/// Two branches, three parts with some opening stock, two payment sources.
fn seeded_book(allow_negative_stock: bool) -> (ShopBook, Vec<String>, Vec<String>) {
    let mut book = ShopBook::new(BookSettings {
        allow_negative_stock,
        ..BookSettings::default()
    });
    for id in BRANCHES {
        book.add_branch(Branch {
            id: id.to_string(),
            name: id.to_string(),
            address: None,
        })
        .unwrap();
    }

    let parts = ["PAD", "OIL", "PLUG"]
        .iter()
        .enumerate()
        .map(|(i, sku)| {
            book.add_part(NewPart {
                sku: sku.to_string(),
                name: sku.to_string(),
                category: "Test".to_string(),
                cost_price: Money::new(1_000 * (i as i64 + 1)),
                selling_price: Money::new(1_500 * (i as i64 + 1)),
                opening_stock: BTreeMap::from([("HN".to_string(), 10 * i as i64)]),
                date: date(),
            })
            .unwrap()
            .id
        })
        .collect();

    let sources = ["Cash", "Bank"]
        .iter()
        .map(|name| {
            book.add_payment_source(NewPaymentSource {
                name: name.to_string(),
                opening_balance: BTreeMap::from([("HN".to_string(), Money::new(100_000))]),
                date: date(),
            })
            .unwrap()
            .id
        })
        .collect();

    (book, parts, sources)
}

#[derive(Debug, Clone)]
enum Op {
    Stock { inbound: bool, part: usize, branch: usize, qty: i64 },
    Transfer { part: usize, from: usize, qty: i64 },
    DeleteInventory { pick: usize },
    Sale { part: usize, source: usize, qty: i64 },
    DeleteSale { pick: usize },
    Cash { income: bool, source: usize, branch: usize, amount: i64 },
    EditCash { pick: usize, source: usize, amount: i64 },
    DeleteCash { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), 0usize..3, 0usize..2, 1i64..20).prop_map(|(inbound, part, branch, qty)| {
            Op::Stock { inbound, part, branch, qty }
        }),
        (0usize..3, 0usize..2, 1i64..20).prop_map(|(part, from, qty)| Op::Transfer {
            part,
            from,
            qty
        }),
        any::<usize>().prop_map(|pick| Op::DeleteInventory { pick }),
        (0usize..3, 0usize..2, 1i64..5).prop_map(|(part, source, qty)| Op::Sale {
            part,
            source,
            qty
        }),
        any::<usize>().prop_map(|pick| Op::DeleteSale { pick }),
        (any::<bool>(), 0usize..2, 0usize..2, 1i64..50_000).prop_map(
            |(income, source, branch, amount)| Op::Cash { income, source, branch, amount }
        ),
        (any::<usize>(), 0usize..2, 1i64..50_000).prop_map(|(pick, source, amount)| {
            Op::EditCash { pick, source, amount }
        }),
        any::<usize>().prop_map(|pick| Op::DeleteCash { pick }),
    ]
}

fn cash_draft(income: bool, source: &str, branch: &str, amount: i64) -> NewCashTransaction {
    NewCashTransaction {
        flow: if income { CashFlow::Income } else { CashFlow::Expense },
        category: CashCategory::Other,
        amount: Money::new(amount),
        contact: None,
        payment_source_id: source.to_string(),
        branch_id: branch.to_string(),
        date: date(),
        notes: None,
    }
}

/// Applies one operation. Errors (overdraft, linked rows) are expected and
/// ignored; the book must be unchanged by them.
fn apply(book: &mut ShopBook, parts: &[String], sources: &[String], op: Op) {
    let _ = match op {
        Op::Stock { inbound, part, branch, qty } => book
            .record_inventory(NewInventoryTransaction {
                direction: if inbound {
                    InventoryDirection::In
                } else {
                    InventoryDirection::Out
                },
                part_id: parts[part].clone(),
                quantity: qty,
                unit_price: None,
                branch_id: BRANCHES[branch].to_string(),
                date: date(),
                notes: None,
            })
            .map(|_| ()),
        Op::Transfer { part, from, qty } => book
            .transfer_stock(TransferRequest {
                part_id: parts[part].clone(),
                quantity: qty,
                from_branch: BRANCHES[from].to_string(),
                to_branch: BRANCHES[1 - from].to_string(),
                date: date(),
                notes: None,
            })
            .map(|_| ()),
        Op::DeleteInventory { pick } => {
            if book.inventory().is_empty() {
                return;
            }
            let id = book.inventory()[pick % book.inventory().len()].id.clone();
            book.delete_inventory(&id)
        }
        Op::Sale { part, source, qty } => book
            .create_sale(SaleDraft {
                branch_id: "HN".to_string(),
                customer_id: None,
                customer_name: None,
                items: vec![SaleLineDraft {
                    part_id: parts[part].clone(),
                    quantity: qty,
                    unit_price: None,
                }],
                discount: Money::zero(),
                payment_source_id: sources[source].clone(),
                date: date(),
                notes: None,
            })
            .map(|_| ()),
        Op::DeleteSale { pick } => {
            if book.sales().is_empty() {
                return;
            }
            let id = book.sales()[pick % book.sales().len()].id.clone();
            book.delete_sale(&id)
        }
        Op::Cash { income, source, branch, amount } => book
            .record_cash(cash_draft(income, &sources[source], BRANCHES[branch], amount))
            .map(|_| ()),
        Op::EditCash { pick, source, amount } => {
            if book.cash_transactions().is_empty() {
                return;
            }
            let tx = &book.cash_transactions()[pick % book.cash_transactions().len()];
            let id = tx.id.clone();
            let draft = cash_draft(false, &sources[source], &tx.branch_id, amount);
            book.update_cash(&id, draft).map(|_| ())
        }
        Op::DeleteCash { pick } => {
            if book.cash_transactions().is_empty() {
                return;
            }
            let id = book.cash_transactions()[pick % book.cash_transactions().len()]
                .id
                .clone();
            book.delete_cash(&id)
        }
    };
}

fn recorded_stock(book: &ShopBook) -> BTreeMap<(String, String), i64> {
    let mut stock = BTreeMap::new();
    for part in book.parts() {
        for (branch, qty) in &part.stock {
            if *qty != 0 {
                stock.insert((part.id.clone(), branch.clone()), *qty);
            }
        }
    }
    stock
}

fn replayed_stock(book: &ShopBook) -> BTreeMap<(String, String), i64> {
    let mut stock: BTreeMap<(String, String), i64> = BTreeMap::new();
    for tx in book.inventory() {
        let signed = match tx.direction {
            InventoryDirection::In => tx.quantity,
            InventoryDirection::Out => -tx.quantity,
        };
        *stock
            .entry((tx.part_id.clone(), tx.branch_id.clone()))
            .or_insert(0) += signed;
    }
    stock.retain(|_, q| *q != 0);
    stock
}

fn recorded_balances(book: &ShopBook) -> BTreeMap<(String, String), i64> {
    let mut balances = BTreeMap::new();
    for source in book.payment_sources() {
        for (branch, amount) in &source.balance {
            if !amount.is_zero() {
                balances.insert((source.id.clone(), branch.clone()), amount.amount());
            }
        }
    }
    balances
}

fn replayed_balances(book: &ShopBook) -> BTreeMap<(String, String), i64> {
    let mut balances: BTreeMap<(String, String), i64> = BTreeMap::new();
    for tx in book.cash_transactions() {
        let signed = match tx.flow {
            CashFlow::Income => tx.amount.amount(),
            CashFlow::Expense => -tx.amount.amount(),
        };
        *balances
            .entry((tx.payment_source_id.clone(), tx.branch_id.clone()))
            .or_insert(0) += signed;
    }
    balances.retain(|_, a| *a != 0);
    balances
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn stock_always_equals_inventory_replay(
        allow_negative in any::<bool>(),
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let (mut book, parts, sources) = seeded_book(allow_negative);
        for op in ops {
            apply(&mut book, &parts, &sources, op);
            prop_assert_eq!(recorded_stock(&book), replayed_stock(&book));
        }
        prop_assert!(book.verify_consistency());
    }

    #[test]
    fn balances_always_equal_cash_replay(
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let (mut book, parts, sources) = seeded_book(false);
        for op in ops {
            apply(&mut book, &parts, &sources, op);
            prop_assert_eq!(recorded_balances(&book), replayed_balances(&book));
        }
    }

    #[test]
    fn guarded_book_never_goes_negative(
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let (mut book, parts, sources) = seeded_book(false);
        for op in ops {
            // Deletes may legitimately undo an inbound that later outbounds
            // relied on; only check after postings that can be guarded.
            let guarded = matches!(op, Op::Stock { .. } | Op::Transfer { .. } | Op::Sale { .. });
            let before = recorded_stock(&book);
            apply(&mut book, &parts, &sources, op);
            if guarded {
                for (key, qty) in recorded_stock(&book) {
                    let was = before.get(&key).copied().unwrap_or(0);
                    if was >= 0 {
                        prop_assert!(qty >= 0, "{:?} fell to {}", key, qty);
                    } else {
                        // Already short after a delete: guarded postings may only refill.
                        prop_assert!(qty >= was, "{:?} went from {} to {}", key, was, qty);
                    }
                }
            }
        }
    }

    #[test]
    fn sale_then_delete_restores_state(
        part in 0usize..3,
        source in 0usize..2,
        qty in 1i64..5,
        discount in 0i64..1_000,
    ) {
        let (mut book, parts, sources) = seeded_book(true);
        let stock_before = recorded_stock(&book);
        let balances_before = recorded_balances(&book);

        let sale = book.create_sale(SaleDraft {
            branch_id: "HN".to_string(),
            customer_id: None,
            customer_name: None,
            items: vec![SaleLineDraft {
                part_id: parts[part].clone(),
                quantity: qty,
                unit_price: None,
            }],
            discount: Money::new(discount),
            payment_source_id: sources[source].clone(),
            date: date(),
            notes: None,
        });
        prop_assume!(sale.is_ok());
        let sale = sale.unwrap();
        prop_assert_ne!(recorded_stock(&book), stock_before.clone());

        book.delete_sale(&sale.id).unwrap();
        prop_assert_eq!(recorded_stock(&book), stock_before);
        prop_assert_eq!(recorded_balances(&book), balances_before);
    }

    #[test]
    fn work_order_total_matches_formula(
        labor in 0i64..500_000,
        qty in 1i64..4,
        quote_qty in 1i64..4,
        quote_price in 0i64..100_000,
        discount in 0i64..50_000,
        updated_labor in 0i64..500_000,
    ) {
        let (mut book, parts, _) = seeded_book(true);
        let draft = |labor: i64| WorkOrderDraft {
            branch_id: "HN".to_string(),
            customer_id: None,
            customer_name: "Khách".to_string(),
            customer_phone: None,
            vehicle: None,
            license_plate: None,
            odometer: None,
            issue_description: "Service".to_string(),
            technician: None,
            status: WorkOrderStatus::Received,
            parts: vec![PartUsageDraft {
                part_id: parts[1].clone(),
                quantity: qty,
                price: None,
            }],
            quotation_items: vec![QuotationItem {
                description: "Labour extra".to_string(),
                quantity: quote_qty,
                unit_price: Money::new(quote_price),
            }],
            labor_cost: Money::new(labor),
            discount: Money::new(discount),
            received_on: date(),
        };

        let created = book.create_work_order(draft(labor), date());
        prop_assume!(created.is_ok());
        let created = created.unwrap();
        let expected = compute_total(
            created.labor_cost,
            &created.parts_used,
            &created.quotation_items,
            created.discount,
        ).unwrap();
        prop_assert_eq!(created.total, expected);
        prop_assert_eq!(
            created.total.amount(),
            labor + 1_500 * 2 * qty + quote_price * quote_qty - discount
        );

        if let Ok(updated) = book.update_work_order(&created.id, draft(updated_labor), date()) {
            prop_assert_eq!(
                updated.total.amount(),
                updated_labor + 1_500 * 2 * qty + quote_price * quote_qty - discount
            );
        }
        prop_assert!(book.verify_consistency());
    }
}

#[test]
fn outbound_then_delete_restores_branch_stock() {
    let (mut book, parts, _) = seeded_book(false);
    // Second part opens with {HN: 10}.
    let part_id = parts[1].clone();
    assert_eq!(book.part(&part_id).unwrap().stock_at("HN"), 10);

    let tx = book
        .record_inventory(NewInventoryTransaction {
            direction: InventoryDirection::Out,
            part_id: part_id.clone(),
            quantity: 3,
            unit_price: None,
            branch_id: "HN".to_string(),
            date: date(),
            notes: None,
        })
        .unwrap();
    assert_eq!(book.part(&part_id).unwrap().stock_at("HN"), 7);

    book.delete_inventory(&tx.id).unwrap();
    assert_eq!(book.part(&part_id).unwrap().stock_at("HN"), 10);
}

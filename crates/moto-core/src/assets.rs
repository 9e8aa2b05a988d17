//! Fixed assets and capital investments.
//!
//! Plain rows with no ledger effect; their per-branch totals feed the
//! business snapshot.

use chrono::Utc;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{CapitalInvestment, FixedAsset, NewCapitalInvestment, NewFixedAsset};
use crate::validation::{validate_amount, validate_required_text};

pub fn build_fixed_asset(draft: NewFixedAsset) -> CoreResult<FixedAsset> {
    validate_required_text("name", &draft.name, 200)?;
    validate_amount(draft.price)?;

    Ok(FixedAsset {
        id: Uuid::new_v4().to_string(),
        name: draft.name.trim().to_string(),
        price: draft.price,
        date: draft.date,
        branch_id: draft.branch_id,
        notes: draft.notes,
        created_at: Utc::now(),
    })
}

pub fn build_capital_investment(draft: NewCapitalInvestment) -> CoreResult<CapitalInvestment> {
    validate_required_text("description", &draft.description, 500)?;
    validate_amount(draft.amount)?;

    Ok(CapitalInvestment {
        id: Uuid::new_v4().to_string(),
        description: draft.description.trim().to_string(),
        amount: draft.amount,
        date: draft.date,
        branch_id: draft.branch_id,
        created_at: Utc::now(),
    })
}

/// Total purchase price of the assets at a branch (all branches on `None`).
pub fn fixed_asset_total(assets: &[FixedAsset], branch_id: Option<&str>) -> Money {
    assets
        .iter()
        .filter(|a| branch_id.map_or(true, |b| a.branch_id == b))
        .map(|a| a.price)
        .sum()
}

/// Total capital put into a branch (all branches on `None`).
pub fn capital_total(capital: &[CapitalInvestment], branch_id: Option<&str>) -> Money {
    capital
        .iter()
        .filter(|c| branch_id.map_or(true, |b| c.branch_id == b))
        .map(|c| c.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn asset(name: &str, price: i64, branch: &str) -> FixedAsset {
        build_fixed_asset(NewFixedAsset {
            name: name.to_string(),
            price: Money::new(price),
            date: date(),
            branch_id: branch.to_string(),
            notes: None,
        })
        .unwrap()
    }

    #[test]
    fn test_totals_per_branch() {
        let assets = vec![
            asset("Hydraulic lift", 15_000_000, "HN"),
            asset("Compressor", 4_500_000, "HN"),
            asset("Tyre changer", 9_000_000, "HCM"),
        ];
        assert_eq!(fixed_asset_total(&assets, Some("HN")).amount(), 19_500_000);
        assert_eq!(fixed_asset_total(&assets, None).amount(), 28_500_000);
        assert!(fixed_asset_total(&assets, Some("DN")).is_zero());
    }

    #[test]
    fn test_capital_requires_positive_amount() {
        let draft = NewCapitalInvestment {
            description: "Owner top-up".to_string(),
            amount: Money::zero(),
            date: date(),
            branch_id: "HN".to_string(),
        };
        assert!(build_capital_investment(draft).is_err());

        let ok = build_capital_investment(NewCapitalInvestment {
            description: "Owner top-up".to_string(),
            amount: Money::new(50_000_000),
            date: date(),
            branch_id: "HN".to_string(),
        })
        .unwrap();
        assert_eq!(capital_total(&[ok], Some("HN")).amount(), 50_000_000);
    }
}

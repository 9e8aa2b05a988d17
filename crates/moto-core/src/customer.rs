//! # Customers
//!
//! Customer records, loyalty points and the oil-change reminder.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{Customer, NewCustomer};
use crate::validation::{validate_odometer, validate_phone, validate_required_text};

fn validate_customer(draft: &NewCustomer) -> CoreResult<()> {
    validate_required_text("name", &draft.name, 200)?;
    validate_phone(&draft.phone)?;
    if let Some(km) = draft.last_service_odometer {
        validate_odometer(km)?;
    }
    Ok(())
}

/// Builds a new customer with zero loyalty points.
pub fn build_customer(draft: NewCustomer) -> CoreResult<Customer> {
    validate_customer(&draft)?;

    Ok(Customer {
        id: Uuid::new_v4().to_string(),
        name: draft.name.trim().to_string(),
        phone: draft.phone.trim().to_string(),
        vehicle: draft.vehicle,
        license_plate: draft.license_plate,
        loyalty_points: 0,
        last_service_odometer: draft.last_service_odometer,
        last_service_date: draft.last_service_date,
        created_at: Utc::now(),
    })
}

/// Overwrites the editable fields. Loyalty points are left alone.
pub fn apply_customer_update(customer: &mut Customer, draft: NewCustomer) -> CoreResult<()> {
    validate_customer(&draft)?;

    customer.name = draft.name.trim().to_string();
    customer.phone = draft.phone.trim().to_string();
    customer.vehicle = draft.vehicle;
    customer.license_plate = draft.license_plate;
    customer.last_service_odometer = draft.last_service_odometer;
    customer.last_service_date = draft.last_service_date;
    Ok(())
}

/// Points earned by a purchase: one per full `point_value` spent.
///
/// ```rust
/// use moto_core::customer::loyalty_points_for;
/// use moto_core::money::Money;
///
/// assert_eq!(loyalty_points_for(Money::new(125_000), 10_000), 12);
/// assert_eq!(loyalty_points_for(Money::new(9_999), 10_000), 0);
/// ```
pub fn loyalty_points_for(total: Money, point_value: i64) -> i64 {
    if point_value <= 0 || !total.is_positive() {
        return 0;
    }
    total.units_of(point_value)
}

pub fn add_points(customer: &mut Customer, points: i64) {
    customer.loyalty_points += points.max(0);
}

/// Takes points back, never going below zero.
pub fn remove_points(customer: &mut Customer, points: i64) {
    customer.loyalty_points = (customer.loyalty_points - points.max(0)).max(0);
}

/// Stamps a service visit. An older visit never overwrites a newer one.
pub fn record_service(customer: &mut Customer, odometer: Option<i64>, date: NaiveDate) {
    if customer.last_service_date.is_some_and(|last| last > date) {
        return;
    }
    customer.last_service_date = Some(date);
    if odometer.is_some() {
        customer.last_service_odometer = odometer;
    }
}

/// Whether a customer should be reminded of an oil change.
///
/// Due when the last service is at least `interval_days` before `today`,
/// or when nothing is on record but a vehicle is registered.
pub fn due_for_oil_change(customer: &Customer, today: NaiveDate, interval_days: i64) -> bool {
    match customer.last_service_date {
        Some(last) => (today - last).num_days() >= interval_days,
        None => customer.vehicle.as_deref().is_some_and(|v| !v.trim().is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn draft() -> NewCustomer {
        NewCustomer {
            name: " Nguyễn Văn An ".to_string(),
            phone: "0987654321".to_string(),
            vehicle: Some("Yamaha Exciter".to_string()),
            license_plate: Some("59X1-456.78".to_string()),
            last_service_odometer: None,
            last_service_date: None,
        }
    }

    #[test]
    fn test_build_customer() {
        let c = build_customer(draft()).unwrap();
        assert_eq!(c.name, "Nguyễn Văn An");
        assert_eq!(c.loyalty_points, 0);

        let mut bad = draft();
        bad.phone = "abc".to_string();
        assert!(matches!(build_customer(bad), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_update_keeps_points() {
        let mut c = build_customer(draft()).unwrap();
        add_points(&mut c, 7);
        let mut d = draft();
        d.name = "An".to_string();
        apply_customer_update(&mut c, d).unwrap();
        assert_eq!(c.name, "An");
        assert_eq!(c.loyalty_points, 7);
    }

    #[test]
    fn test_points_floor_at_zero() {
        let mut c = build_customer(draft()).unwrap();
        add_points(&mut c, loyalty_points_for(Money::new(55_000), 10_000));
        assert_eq!(c.loyalty_points, 5);
        remove_points(&mut c, 8);
        assert_eq!(c.loyalty_points, 0);
        assert_eq!(loyalty_points_for(Money::new(55_000), 0), 0);
    }

    #[test]
    fn test_record_service_ignores_older_visit() {
        let mut c = build_customer(draft()).unwrap();
        record_service(&mut c, Some(12_000), date(3, 1));
        record_service(&mut c, Some(11_000), date(2, 1));
        assert_eq!(c.last_service_date, Some(date(3, 1)));
        assert_eq!(c.last_service_odometer, Some(12_000));

        record_service(&mut c, None, date(4, 1));
        assert_eq!(c.last_service_date, Some(date(4, 1)));
        assert_eq!(c.last_service_odometer, Some(12_000));
    }

    #[test]
    fn test_oil_change_due() {
        let mut c = build_customer(draft()).unwrap();
        // No history, vehicle registered.
        assert!(due_for_oil_change(&c, date(6, 1), 90));

        c.last_service_date = Some(date(3, 3));
        assert!(!due_for_oil_change(&c, date(5, 31), 90));
        assert!(due_for_oil_change(&c, date(6, 1), 90));

        c.last_service_date = None;
        c.vehicle = None;
        assert!(!due_for_oil_change(&c, date(6, 1), 90));
    }
}

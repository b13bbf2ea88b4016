//! Flat-rate interest and ROI.
//!
//! Both values are computed once and frozen onto their records: total interest at
//! loan creation, ROI when an investment is written. Results that do not fit in a
//! [`Decimal`] come back as `None`.

use rust_decimal::Decimal;

/// Total interest owed on a loan: `principal * rate_percent / 100`.
///
/// # Arguments
/// * `principal` - Loan principal
/// * `rate_percent` - Interest rate in percent (5 means 5%)
///
/// # Examples
/// ```
/// use lending_core::math::interest::calculate_total_interest;
/// use rust_decimal::Decimal;
///
/// assert_eq!(
///     calculate_total_interest(Decimal::from(1_000_000), Decimal::from(5)),
///     Some(Decimal::from(50_000))
/// );
/// assert_eq!(calculate_total_interest(Decimal::MAX, Decimal::from(500)), None);
/// ```
pub fn calculate_total_interest(principal: Decimal, rate_percent: Decimal) -> Option<Decimal> {
    principal.checked_mul(percent_to_fraction(rate_percent))
}

/// ROI recorded on an investment: `principal * rate_fraction + amount`.
///
/// The return is based on the whole loan principal, not on the investor's share of
/// it. Callers convert the loan's percentage rate to a fraction first.
///
/// # Arguments
/// * `principal` - Loan principal
/// * `rate_fraction` - Interest rate as a fraction (0.05 means 5%)
/// * `amount` - The investor's contribution
pub fn calculate_roi(
    principal: Decimal,
    rate_fraction: Decimal,
    amount: Decimal,
) -> Option<Decimal> {
    principal.checked_mul(rate_fraction)?.checked_add(amount)
}

/// Convert a percentage rate to a fraction
pub fn percent_to_fraction(rate_percent: Decimal) -> Decimal {
    rate_percent / Decimal::ONE_HUNDRED
}

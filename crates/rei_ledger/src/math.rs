//! Fixed-point arithmetic helpers - checked, no unwrap, no panics

/// Token quantity with 9 decimal places.
pub type Amount = u128;

/// Price of one whole unit in reference currency, same 9-decimal scale.
pub type Price = u128;

/// Seconds since the UNIX epoch.
pub type Timestamp = u64;

/// 1.0 in `Amount`/`Price` units
pub const AMOUNT_SCALE: u128 = 1_000_000_000;

/// 100% in basis points
pub const BPS_DENOMINATOR: u128 = 10_000;

pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;
/// Divisor turning `value * fee_bps * seconds` into a fee
pub const FEE_DENOMINATOR: u128 = BPS_DENOMINATOR * SECONDS_PER_YEAR as u128;

/// Add, `None` on overflow
pub fn add(a: u128, b: u128) -> Option<u128> {
    a.checked_add(b)
}

/// Subtract, `None` on underflow
pub fn sub(a: u128, b: u128) -> Option<u128> {
    a.checked_sub(b)
}

/// `a * b / c` with the product checked. `None` on overflow or `c == 0`.
pub fn mul_div(a: u128, b: u128, c: u128) -> Option<u128> {
    if c == 0 {
        return None;
    }
    a.checked_mul(b).map(|p| p / c)
}

/// Reference-currency value of `amount` at `price` (floored)
pub fn value_of(amount: Amount, price: Price) -> Option<u128> {
    mul_div(amount, price, AMOUNT_SCALE)
}

/// How many whole-scaled units `value` buys at `price` (floored)
pub fn units_for(value: u128, price: Price) -> Option<Amount> {
    mul_div(value, AMOUNT_SCALE, price)
}

/// Apply a basis-point rate to `value`
pub fn apply_bps(value: u128, bps: u64) -> Option<u128> {
    mul_div(value, bps as u128, BPS_DENOMINATOR)
}

/// Convert a decimal to fixed point. Negative, NaN and infinite inputs are rejected.
pub fn to_amount(value: f64) -> Option<Amount> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let scaled = (value * AMOUNT_SCALE as f64).round();
    if scaled >= u128::MAX as f64 {
        return None;
    }
    Some(scaled as u128)
}

/// Convert fixed point to a decimal, for display and logs only
pub fn from_amount(amount: Amount) -> f64 {
    amount as f64 / AMOUNT_SCALE as f64
}

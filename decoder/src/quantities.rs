//! Conversions between the exchange's integer encodings and human values.
//!
//! Prices on the exchange are quote atoms per base atom, stored as a `u128`
//! scaled by `10^18`. New prices are submitted as a `(mantissa, exponent)`
//! pair. Balances are integer atom counts of a mint with a fixed number of
//! decimals.

/// Number of decimal places in a stored scaled price.
pub const PRICE_SCALE_DECIMALS: i32 = 18;
/// Largest exponent the exchange accepts for a submitted price.
pub const PRICE_MAX_EXP: i32 = 8;
/// Smallest exponent `to_mantissa_and_exponent` will produce.
pub const PRICE_MIN_MANTISSA_EXP: i32 = -20;

/// 2^48, below which an integer converts to `f64` without losing digits.
const MAX_EXACT_INTEGER: u128 = 1 << 48;
/// Largest power of ten that is itself exact as an `f64`.
const MAX_EXACT_POW10: i32 = 22;
/// Relative distance, in units of `f64::EPSILON`, under which a scaled token
/// amount counts as a whole number of atoms.
const SNAP_ULPS: f64 = 4.0;

/// Which way a token amount is moving relative to a balance the caller owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Value leaves the caller's balance (withdraw, send). Rounds down.
    Withdraw,
    /// Value enters the caller's balance (deposit, mint). Rounds up.
    Deposit,
}

fn pow10(exponent: i32) -> f64 {
    if exponent.abs() <= MAX_EXACT_POW10 {
        if exponent >= 0 {
            10f64.powi(exponent)
        } else {
            1.0 / 10f64.powi(-exponent)
        }
    } else {
        10f64.powi(exponent)
    }
}

fn scale_by_pow10(value: f64, exponent: i32) -> f64 {
    // Dividing by an exact power keeps one rounding step instead of two.
    if exponent < 0 && -exponent <= MAX_EXACT_POW10 {
        value / 10f64.powi(-exponent)
    } else {
        value * pow10(exponent)
    }
}

/// Splits a price in quote atoms per base atom into the exchange's
/// `(mantissa, exponent)` submission format.
///
/// Small prices are multiplied up until the mantissa has at least eight
/// significant digits or the exponent reaches -20; large prices are divided
/// down until the mantissa fits in a `u32`. The mantissa is floored, so
/// precision below the clamps is silently dropped.
pub fn to_mantissa_and_exponent(price: f64) -> (u32, i32) {
    let u32_span = u32::MAX as f64 + 1.0;
    let mut exponent = 0;
    let mut mantissa = price;
    while exponent > PRICE_MIN_MANTISSA_EXP && mantissa < u32_span / 100.0 {
        exponent -= 1;
        mantissa *= 10.0;
    }
    while exponent < PRICE_MAX_EXP && mantissa > u32::MAX as f64 {
        exponent += 1;
        mantissa /= 10.0;
    }
    // `as` saturates, negative and NaN inputs land on zero.
    (mantissa.floor() as u32, exponent)
}

/// The exchange's own conversion of a submitted price into its stored scaled
/// form, `mantissa * 10^(exponent + 18)`.
pub fn scaled_from_mantissa_and_exponent(mantissa: u32, exponent: i32) -> Option<u128> {
    if !(PRICE_MIN_MANTISSA_EXP..=PRICE_MAX_EXP).contains(&exponent) {
        return None;
    }
    let shift = exponent + PRICE_SCALE_DECIMALS;
    if shift >= 0 {
        (mantissa as u128).checked_mul(10u128.pow(shift as u32))
    } else {
        Some(mantissa as u128 / 10u128.pow((-shift) as u32))
    }
}

/// Decodes a stored scaled price.
///
/// A full `u128` does not convert to `f64` exactly, so trailing digits are
/// divided away until the remainder fits in 48 bits and the dropped digits
/// are folded back into the exponent.
pub fn decode_scaled_u128(raw: u128) -> f64 {
    let mut remaining = raw;
    for exponent in -PRICE_SCALE_DECIMALS..=38 {
        if remaining < MAX_EXACT_INTEGER {
            return scale_by_pow10(remaining as f64, exponent);
        }
        remaining /= 10;
    }
    unreachable!("a u128 has at most 39 decimal digits")
}

/// Inverse of [`decode_scaled_u128`], rounding to the nearest integer.
pub fn encode_scaled_u128(price: f64) -> u128 {
    (price * pow10(PRICE_SCALE_DECIMALS)).round() as u128
}

/// Quote atoms per base atom to quote tokens per base token.
pub fn atoms_price_to_token_price(price: f64, base_decimals: u8, quote_decimals: u8) -> f64 {
    scale_by_pow10(price, base_decimals as i32 - quote_decimals as i32)
}

/// Quote tokens per base token to quote atoms per base atom.
pub fn token_price_to_atoms_price(token_price: f64, base_decimals: u8, quote_decimals: u8) -> f64 {
    scale_by_pow10(token_price, quote_decimals as i32 - base_decimals as i32)
}

pub fn atoms_to_tokens(atoms: u64, decimals: u8) -> f64 {
    scale_by_pow10(atoms as f64, -(decimals as i32))
}

/// Converts a token amount to atoms, rounding so the caller never under-funds
/// the operation: down when value leaves their balance, up when it enters.
///
/// Decimal amounts such as `0.29` are not exact in binary, so a product
/// within a few ulps of an integer is taken as that integer before rounding.
pub fn tokens_to_atoms(tokens: f64, decimals: u8, direction: TransferDirection) -> u64 {
    let scaled = tokens * pow10(decimals as i32);
    let nearest = scaled.round();
    if (scaled - nearest).abs() <= SNAP_ULPS * f64::EPSILON * nearest.abs().max(1.0) {
        return nearest as u64;
    }
    match direction {
        TransferDirection::Withdraw => scaled.floor() as u64,
        TransferDirection::Deposit => scaled.ceil() as u64,
    }
}

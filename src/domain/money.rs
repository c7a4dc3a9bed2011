//! Monetary types for amounts, shares and probabilities.

use rust_decimal::Decimal;

/// Amount of play money, represented as a Decimal for precision.
pub type Amount = Decimal;

/// Outcome shares issued by a market mechanism.
pub type Shares = Decimal;

/// Probability in `[0, 1]`.
pub type Probability = Decimal;

/// Decimal places used when displaying currency amounts.
pub const DISPLAY_DP: u32 = 2;

/// Largest of two decimals.
#[must_use]
pub fn max(a: Decimal, b: Decimal) -> Decimal {
    if a >= b {
        a
    } else {
        b
    }
}

/// Smallest of two decimals.
#[must_use]
pub fn min(a: Decimal, b: Decimal) -> Decimal {
    if a <= b {
        a
    } else {
        b
    }
}

/// Clamp a value into `[0, 1]`.
#[must_use]
pub fn clamp_probability(p: Decimal) -> Probability {
    min(max(p, Decimal::ZERO), Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn min_and_max_pick_the_right_side() {
        assert_eq!(max(dec!(1.5), dec!(-2)), dec!(1.5));
        assert_eq!(min(dec!(1.5), dec!(-2)), dec!(-2));
    }

    #[test]
    fn clamp_probability_bounds() {
        assert_eq!(clamp_probability(dec!(1.2)), Decimal::ONE);
        assert_eq!(clamp_probability(dec!(-0.1)), Decimal::ZERO);
        assert_eq!(clamp_probability(dec!(0.73)), dec!(0.73));
    }
}

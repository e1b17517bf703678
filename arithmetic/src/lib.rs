use core::num::NonZeroU64;

use easy_ext::ext;
use num_integer::Roots as _;

#[ext(U64Ext)]
pub impl u64 {
    #[inline]
    #[must_use]
    fn prev_multiple_of(self, factor: NonZeroU64) -> Self {
        self - self % factor
    }

    #[inline]
    #[must_use]
    fn is_divisible_by(self, factor: NonZeroU64) -> bool {
        self % factor == 0
    }

    /// Largest integer whose square does not exceed `self`.
    #[inline]
    #[must_use]
    fn integer_sqrt(self) -> Self {
        self.sqrt()
    }

    /// Computes `self * numerator / denominator` without overflowing in the intermediate product.
    ///
    /// The result saturates at [`u64::MAX`].
    #[inline]
    #[must_use]
    fn mul_div(self, numerator: Self, denominator: NonZeroU64) -> Self {
        let product = u128::from(self) * u128::from(numerator);
        let quotient = product / u128::from(denominator.get());
        quotient.try_into().unwrap_or(Self::MAX)
    }
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;
    use test_case::test_case;

    use super::*;

    #[test_case(0, 8 => 0)]
    #[test_case(7, 8 => 0)]
    #[test_case(8, 8 => 8)]
    #[test_case(31_999_999_999, 1_000_000_000 => 31_000_000_000)]
    fn prev_multiple_of(value: u64, factor: u64) -> u64 {
        let factor = NonZeroU64::new(factor).expect("test factors are nonzero");
        value.prev_multiple_of(factor)
    }

    #[test_case(0 => 0)]
    #[test_case(1 => 1)]
    #[test_case(8 => 2)]
    #[test_case(32 => 5)]
    #[test_case(1_024_000_000_000 => 1_011_928)]
    #[test_case(u64::MAX => 4_294_967_295)]
    fn integer_sqrt(value: u64) -> u64 {
        value.integer_sqrt()
    }

    #[test]
    fn mul_div_does_not_overflow_in_intermediate_product() {
        assert_eq!(u64::MAX.mul_div(4, nonzero!(8_u64)), u64::MAX / 2);
        assert_eq!(u64::MAX.mul_div(2, nonzero!(1_u64)), u64::MAX);
    }

    #[test]
    fn is_divisible_by_works_at_epoch_boundaries() {
        assert!(64_u64.is_divisible_by(nonzero!(32_u64)));
        assert!(!65_u64.is_divisible_by(nonzero!(32_u64)));
    }
}

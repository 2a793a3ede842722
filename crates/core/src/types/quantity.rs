//! Line item quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The value is zero or negative.
    #[error("quantity must be at least 1")]
    NotPositive,
    /// The value does not fit in a quantity.
    #[error("quantity is too large")]
    TooLarge,
}

/// A quantity of at least one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity from an unsigned count.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NotPositive`] for zero.
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(QuantityError::NotPositive)
    }

    /// Create a quantity from a signed request value.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NotPositive`] for values below one and
    /// [`QuantityError::TooLarge`] for values beyond `u32::MAX`.
    pub fn from_signed(value: i64) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::NotPositive);
        }
        let value = u32::try_from(value).map_err(|_| QuantityError::TooLarge)?;
        Self::new(value)
    }

    /// Returns the count.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.get()).map(Self)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(Quantity::new(0), Err(QuantityError::NotPositive));
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }

    #[test]
    fn test_from_signed() {
        assert_eq!(Quantity::from_signed(-3), Err(QuantityError::NotPositive));
        assert_eq!(Quantity::from_signed(0), Err(QuantityError::NotPositive));
        assert_eq!(Quantity::from_signed(7).unwrap().get(), 7);
        assert_eq!(
            Quantity::from_signed(i64::from(u32::MAX) + 1),
            Err(QuantityError::TooLarge)
        );
    }

    #[test]
    fn test_checked_add() {
        let two = Quantity::new(2).unwrap();
        let three = Quantity::new(3).unwrap();
        assert_eq!(two.checked_add(three).unwrap().get(), 5);
        assert!(Quantity::new(u32::MAX).unwrap().checked_add(Quantity::ONE).is_none());
    }
}

//! Value escrow
//!
//! A [`Coin`] is an opaque balance that can only be split, joined and
//! burned. It is neither `Clone` nor `Copy`, so value is moved, never
//! duplicated. New value enters the system only through a [`Treasury`].
use parking_lot::Mutex;
use thiserror::Error;

pub type Amount = u64;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoinError {
    #[error("cannot split {requested} from a coin holding {available}")]
    Insufficient { requested: Amount, available: Amount },
    #[error("coin still holds {0}")]
    NonZero(Amount),
    #[error("treasury supply would overflow")]
    SupplyOverflow,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("joined coin value would overflow")]
pub struct JoinOverflow {
    pub returned: Coin,
}

#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a coin destroys the value it holds"]
pub struct Coin {
    value: Amount,
}

impl Coin {
    pub fn zero() -> Self {
        Self { value: 0 }
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    /// Take `amount` out of this coin into a new one
    ///
    /// On failure `self` is left untouched.
    pub fn split(&mut self, amount: Amount) -> Result<Coin, CoinError> {
        let rest = self
            .value
            .checked_sub(amount)
            .ok_or(CoinError::Insufficient {
                requested: amount,
                available: self.value,
            })?;
        self.value = rest;
        Ok(Coin { value: amount })
    }

    /// Merge `other` into this coin
    ///
    /// Coins minted by different treasuries can add up past `Amount::MAX`;
    /// then nothing moves and `other` comes back in the error.
    pub fn join(&mut self, other: Coin) -> Result<(), JoinOverflow> {
        match self.value.checked_add(other.value) {
            Some(value) => {
                self.value = value;
                Ok(())
            }
            None => Err(JoinOverflow { returned: other }),
        }
    }

    /// Move everything out, leaving a zero coin behind
    pub fn take(&mut self) -> Coin {
        std::mem::replace(self, Coin::zero())
    }

    pub fn destroy_zero(self) -> Result<(), CoinError> {
        match self.value {
            0 => Ok(()),
            value => Err(CoinError::NonZero(value)),
        }
    }
}

/// The only place new coins come from
///
/// Keeps the outstanding supply so that conservation of value can be
/// checked from the outside.
#[derive(Debug, Default)]
pub struct Treasury {
    supply: Mutex<Amount>,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&self, amount: Amount) -> Result<Coin, CoinError> {
        let mut supply = self.supply.lock();
        *supply = supply
            .checked_add(amount)
            .ok_or(CoinError::SupplyOverflow)?;
        Ok(Coin { value: amount })
    }

    /// Take a coin out of circulation
    pub fn burn(&self, coin: Coin) {
        let mut supply = self.supply.lock();
        *supply = supply.saturating_sub(coin.value);
    }

    pub fn supply(&self) -> Amount {
        *self.supply.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn split_moves_value_out() -> Result<()> {
        let treasury = Treasury::new();
        let mut coin = treasury.mint(100)?;

        let part = coin.split(30)?;

        assert_eq!(part.value(), 30);
        assert_eq!(coin.value(), 70);
        assert_eq!(treasury.supply(), 100);
        Ok(())
    }

    #[test]
    fn failed_split_leaves_coin_alone() -> Result<()> {
        let mut coin = Treasury::new().mint(10)?;

        assert_eq!(
            coin.split(11),
            Err(CoinError::Insufficient {
                requested: 11,
                available: 10
            })
        );
        assert_eq!(coin.value(), 10);
        Ok(())
    }

    #[test]
    fn join_and_take() -> Result<()> {
        let treasury = Treasury::new();
        let mut escrow = Coin::zero();
        escrow.join(treasury.mint(5)?)?;
        escrow.join(treasury.mint(7)?)?;

        let drained = escrow.take();

        assert_eq!(drained.value(), 12);
        assert_eq!(escrow.value(), 0);
        escrow.destroy_zero()?;
        Ok(())
    }

    #[test]
    fn join_past_max_hands_the_coin_back() -> Result<()> {
        let half = Amount::MAX / 2 + 1;
        let mut left = Treasury::new().mint(half)?;
        let right = Treasury::new().mint(half)?;

        let overflow = left.join(right).expect_err("sum exceeds Amount::MAX");

        assert_eq!(overflow.returned.value(), half);
        assert_eq!(left.value(), half);
        Ok(())
    }

    #[test]
    fn destroy_zero_refuses_value() -> Result<()> {
        let coin = Treasury::new().mint(1)?;
        assert_eq!(coin.destroy_zero(), Err(CoinError::NonZero(1)));
        Ok(())
    }

    #[test]
    fn burn_reduces_supply() -> Result<()> {
        let treasury = Treasury::new();
        let coin = treasury.mint(40)?;
        let _kept = treasury.mint(2)?;

        treasury.burn(coin);

        assert_eq!(treasury.supply(), 2);
        assert_eq!(treasury.mint(Amount::MAX), Err(CoinError::SupplyOverflow));
        Ok(())
    }
}

//! Dutch auction record and its transitions
//!
//! [`Auction`] holds the lot as an enum, so that the item and the escrow
//! can never be present at the same time: an open lot owns the item, a
//! sold lot owns the proceeds. Locking and destruction are the job of
//! [`AuctionHouse`](crate::AuctionHouse).
use crate::auth::{Grant, Principal};
use crate::coin::{Amount, Coin};
use crate::id::AuctionId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuctionError {
    #[error("capability does not authorize auction {0}")]
    AuthorizationMismatch(AuctionId),
    #[error("auction {0} is closed")]
    AuctionClosed(AuctionId),
    #[error("auction {0} has not been sold yet")]
    AuctionNotEnded(AuctionId),
    #[error("price must fall below {current}, got {requested}")]
    PriceNotDecreasing { current: Amount, requested: Amount },
    #[error("bid of {offered} is below the required {required}")]
    InsufficientFunds { required: Amount, offered: Amount },
    #[error("auction {0} does not exist")]
    NotFound(AuctionId),
}

/// An operation failed and gave back the resource it was handed
///
/// `bid` hands back the payment, `claim` and `stop` the capability.
#[derive(Debug)]
pub struct Refused<T> {
    pub error: AuctionError,
    pub returned: T,
}

impl<T> Refused<T> {
    pub(crate) fn new(error: AuctionError, returned: T) -> Self {
        Self { error, returned }
    }

    pub fn into_parts(self) -> (AuctionError, T) {
        (self.error, self.returned)
    }
}

impl<T> fmt::Display for Refused<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T: fmt::Debug> std::error::Error for Refused<T> {}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionState {
    Open,
    Sold,
    Cancelled,
}

#[derive(Debug)]
enum Lot<Item> {
    Open { item: Item },
    Sold { escrow: Coin, final_price: Amount },
}

/// The winning bidder's share of a settlement
#[derive(Debug)]
pub struct Settlement<Item> {
    pub item: Item,
    pub change: Coin,
}

/// What is left once an auction is taken apart
#[derive(Debug)]
pub enum Closed<Item> {
    Sold { proceeds: Coin },
    Cancelled { item: Item },
}

#[derive(Debug)]
pub struct Auction<Item> {
    grant: Grant,
    price: Amount,
    min_bid: Option<Amount>,
    lot: Lot<Item>,
}

impl<Item> Auction<Item> {
    pub(crate) fn open(grant: Grant, item: Item, price: Amount, min_bid: Option<Amount>) -> Self {
        Self {
            grant,
            price,
            min_bid,
            lot: Lot::Open { item },
        }
    }

    pub fn id(&self) -> AuctionId {
        self.grant.auction
    }

    pub fn auctioneer(&self) -> &Principal {
        &self.grant.auctioneer
    }

    pub(crate) fn grant(&self) -> &Grant {
        &self.grant
    }

    /// Current ask while open, settlement price once sold
    pub fn price(&self) -> Amount {
        match self.lot {
            Lot::Open { .. } => self.price,
            Lot::Sold { final_price, .. } => final_price,
        }
    }

    pub fn min_bid(&self) -> Option<Amount> {
        self.min_bid
    }

    pub fn state(&self) -> AuctionState {
        match self.lot {
            Lot::Open { .. } => AuctionState::Open,
            Lot::Sold { .. } => AuctionState::Sold,
        }
    }

    pub fn has_ended(&self) -> bool {
        self.state() != AuctionState::Open
    }

    /// Value held in escrow; zero until sold
    pub fn proceeds(&self) -> Amount {
        match &self.lot {
            Lot::Open { .. } => 0,
            Lot::Sold { escrow, .. } => escrow.value(),
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<(), AuctionError> {
        match self.lot {
            Lot::Open { .. } => Ok(()),
            Lot::Sold { .. } => Err(AuctionError::AuctionClosed(self.id())),
        }
    }

    pub(crate) fn ensure_sold(&self) -> Result<(), AuctionError> {
        match self.lot {
            Lot::Sold { .. } => Ok(()),
            Lot::Open { .. } => Err(AuctionError::AuctionNotEnded(self.id())),
        }
    }

    /// Lower the ask; equal prices are rejected too
    pub(crate) fn set_price(&mut self, new_price: Amount) -> Result<(), AuctionError> {
        self.ensure_open()?;
        if new_price >= self.price {
            return Err(AuctionError::PriceNotDecreasing {
                current: self.price,
                requested: new_price,
            });
        }
        self.price = new_price;
        Ok(())
    }

    fn required_payment(&self) -> Amount {
        self.min_bid.map_or(self.price, |min| min.max(self.price))
    }

    /// Accept `payment` at the current price
    ///
    /// All checks run before anything moves, so a refusal hands the
    /// payment back untouched.
    pub(crate) fn settle(&mut self, mut payment: Coin) -> Result<Settlement<Item>, Refused<Coin>> {
        if let Err(e) = self.ensure_open() {
            return Err(Refused::new(e, payment));
        }

        let required = self.required_payment();
        if payment.value() < required {
            return Err(Refused::new(
                AuctionError::InsufficientFunds {
                    required,
                    offered: payment.value(),
                },
                payment,
            ));
        }

        let escrow = match payment.split(self.price) {
            Ok(escrow) => escrow,
            Err(_) => {
                return Err(Refused::new(
                    AuctionError::InsufficientFunds {
                        required,
                        offered: payment.value(),
                    },
                    payment,
                ))
            }
        };

        let sold = Lot::Sold {
            escrow,
            final_price: self.price,
        };
        match std::mem::replace(&mut self.lot, sold) {
            Lot::Open { item } => Ok(Settlement {
                item,
                change: payment,
            }),
            Lot::Sold { .. } => unreachable!("lot checked open above"),
        }
    }

    /// Take the auction apart
    ///
    /// An open auction becomes cancelled and gives back its item; a sold
    /// one gives up its escrow.
    pub(crate) fn close(self) -> Closed<Item> {
        match self.lot {
            Lot::Open { item } => Closed::Cancelled { item },
            Lot::Sold { escrow, .. } => Closed::Sold { proceeds: escrow },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::AuctioneerCap;
    use crate::coin::Treasury;
    use crate::id::ObjectId;
    use anyhow::Result;

    fn open_auction(price: Amount, min_bid: Option<Amount>) -> Auction<&'static str> {
        let auction = ObjectId::fresh();
        let cap = AuctioneerCap::mint(auction);
        let grant = Grant {
            auction,
            capability: cap.id(),
            auctioneer: Principal::new("seller"),
        };
        Auction::open(grant, "ticket", price, min_bid)
    }

    #[test]
    fn price_only_falls() {
        let mut auction = open_auction(100, None);

        assert_eq!(auction.set_price(90), Ok(()));
        assert_eq!(
            auction.set_price(90),
            Err(AuctionError::PriceNotDecreasing {
                current: 90,
                requested: 90
            })
        );
        assert!(auction.set_price(95).is_err());
        assert_eq!(auction.price(), 90);
    }

    #[test]
    fn settle_moves_price_into_escrow() -> Result<()> {
        let treasury = Treasury::new();
        let mut auction = open_auction(60, None);

        let settlement = auction.settle(treasury.mint(75)?)?;

        assert_eq!(settlement.item, "ticket");
        assert_eq!(settlement.change.value(), 15);
        assert_eq!(auction.state(), AuctionState::Sold);
        assert_eq!(auction.proceeds(), 60);
        assert!(auction.has_ended());
        Ok(())
    }

    #[test]
    fn second_settle_is_refused_with_payment_back() -> Result<()> {
        let treasury = Treasury::new();
        let mut auction = open_auction(10, None);
        let _won = auction.settle(treasury.mint(10)?)?;

        let refused = auction
            .settle(treasury.mint(50)?)
            .expect_err("already sold");

        assert_eq!(refused.error, AuctionError::AuctionClosed(auction.id()));
        assert_eq!(refused.returned.value(), 50);
        Ok(())
    }

    #[test]
    fn min_bid_raises_the_bar() -> Result<()> {
        let treasury = Treasury::new();
        let mut auction = open_auction(50, Some(70));
        auction.set_price(20)?;

        let refused = auction.settle(treasury.mint(40)?).expect_err("below min bid");
        assert_eq!(
            refused.error,
            AuctionError::InsufficientFunds {
                required: 70,
                offered: 40
            }
        );

        // the escrow takes the ask, not the minimum
        let settlement = auction.settle(treasury.mint(70)?)?;
        assert_eq!(settlement.change.value(), 50);
        assert_eq!(auction.proceeds(), 20);
        Ok(())
    }

    #[test]
    fn close_hands_back_what_the_lot_holds() -> Result<()> {
        let open = open_auction(5, None);
        assert!(matches!(open.close(), Closed::Cancelled { item: "ticket" }));

        let mut sold = open_auction(5, None);
        let _won = sold.settle(Treasury::new().mint(5)?)?;
        sold.set_price(1).expect_err("sold auctions keep their price");
        match sold.close() {
            Closed::Sold { proceeds } => assert_eq!(proceeds.value(), 5),
            Closed::Cancelled { .. } => panic!("sold auction closed as cancelled"),
        }
        Ok(())
    }
}

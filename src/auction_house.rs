//! Auction House
//!
//! Owns every live auction and is the only way to touch one. Each auction
//! sits in its own slot behind its own mutex, held across the whole
//! check-then-mutate sequence of an operation, so that concurrent calls
//! against one auction run one after another. Destroying an auction
//! empties the slot before removing it from the arena; anyone still
//! queued on that slot sees `NotFound`.
use crate::auction::{Auction, AuctionError, AuctionState, Closed, Refused, Settlement};
use crate::auth::{AuthPolicy, Grant, Principal, TokenUse};
use crate::capability::AuctioneerCap;
use crate::coin::{Amount, Coin};
use crate::event::AuctionEvent;
use crate::event_log::SharedNotifier;
use crate::id::{AuctionId, ObjectId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

type Slot<Item> = Arc<Mutex<Option<Auction<Item>>>>;

/// Read-only view of a live auction
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuctionSnapshot {
    pub auction_id: AuctionId,
    pub auctioneer: Principal,
    pub price: Amount,
    pub min_bid: Option<Amount>,
    pub proceeds: Amount,
    pub state: AuctionState,
}

pub struct AuctionHouse<Item> {
    policy: AuthPolicy,
    auctions: RwLock<BTreeMap<AuctionId, Slot<Item>>>,
    notifier: SharedNotifier,
}

impl<Item> AuctionHouse<Item> {
    pub fn new(policy: AuthPolicy, notifier: SharedNotifier) -> Self {
        Self {
            policy,
            auctions: RwLock::new(BTreeMap::new()),
            notifier,
        }
    }

    pub fn policy(&self) -> AuthPolicy {
        self.policy
    }

    /// Number of live auctions
    pub fn len(&self) -> usize {
        self.auctions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<AuctionId> {
        self.auctions.read().keys().copied().collect()
    }

    fn slot(&self, id: AuctionId) -> Result<Slot<Item>, AuctionError> {
        self.auctions
            .read()
            .get(&id)
            .cloned()
            .ok_or(AuctionError::NotFound(id))
    }

    /// Free the arena entry of an auction whose slot was already emptied
    fn forget(&self, id: AuctionId) {
        self.auctions.write().remove(&id);
    }

    fn authorize(
        &self,
        auction: &Auction<Item>,
        caller: &Principal,
        cap: &AuctioneerCap,
        token_use: TokenUse,
    ) -> Result<(), AuctionError> {
        if self.policy.authorize(auction.grant(), caller, cap, token_use) {
            Ok(())
        } else {
            Err(AuctionError::AuthorizationMismatch(auction.id()))
        }
    }

    fn read<R>(
        &self,
        id: AuctionId,
        f: impl FnOnce(&Auction<Item>) -> R,
    ) -> Result<R, AuctionError> {
        let slot = self.slot(id)?;
        let guard = slot.lock();
        let auction = guard.as_ref().ok_or(AuctionError::NotFound(id))?;
        Ok(f(auction))
    }

    /// Put `item` up for sale at `initial_price`
    ///
    /// The returned token is the only one that will ever manage the new
    /// auction.
    pub fn create(
        &self,
        auctioneer: Principal,
        item: Item,
        initial_price: Amount,
        min_bid: Option<Amount>,
    ) -> (AuctionId, AuctioneerCap) {
        let id = ObjectId::fresh();
        let cap = AuctioneerCap::mint(id);
        let grant = Grant {
            auction: id,
            capability: cap.id(),
            auctioneer,
        };
        let slot = Arc::new(Mutex::new(Some(Auction::open(
            grant,
            item,
            initial_price,
            min_bid,
        ))));

        // hold the slot so nobody sees the auction before its creation event
        let guard = slot.lock();
        self.auctions.write().insert(id, slot.clone());
        info!(auction_id = %id, initial_price, ?min_bid, "auction created");
        self.notifier.notify(AuctionEvent::AuctionCreated {
            auction_id: id,
            maximal_price: initial_price,
        });
        drop(guard);

        (id, cap)
    }

    pub fn set_price(
        &self,
        id: AuctionId,
        caller: &Principal,
        cap: &AuctioneerCap,
        new_price: Amount,
    ) -> Result<(), AuctionError> {
        let slot = self.slot(id)?;
        let mut guard = slot.lock();
        let auction = guard.as_mut().ok_or(AuctionError::NotFound(id))?;

        self.authorize(auction, caller, cap, TokenUse::Present)
            .and_then(|()| auction.set_price(new_price))
            .map_err(|e| {
                debug!(auction_id = %id, new_price, error = %e, "price change rejected");
                e
            })?;

        info!(auction_id = %id, new_price, "price lowered");
        self.notifier.notify(AuctionEvent::PriceUpdated {
            auction_id: id,
            new_price,
        });
        Ok(())
    }

    /// Buy the item at the current price
    ///
    /// Out of any number of concurrent bids on one auction at most one
    /// succeeds. A refused bid gets its payment back untouched.
    pub fn bid(
        &self,
        id: AuctionId,
        bidder: &Principal,
        payment: Coin,
    ) -> Result<Settlement<Item>, Refused<Coin>> {
        let slot = match self.slot(id) {
            Ok(slot) => slot,
            Err(e) => return Err(Refused::new(e, payment)),
        };
        let mut guard = slot.lock();
        let auction = match guard.as_mut() {
            Some(auction) => auction,
            None => return Err(Refused::new(AuctionError::NotFound(id), payment)),
        };

        let settlement = auction.settle(payment).map_err(|refused| {
            debug!(auction_id = %id, %bidder, error = %refused.error, "bid rejected");
            refused
        })?;

        let final_price = auction.price();
        info!(auction_id = %id, %bidder, final_price, "auction settled");
        self.notifier.notify(AuctionEvent::AuctionSucceeded {
            auction_id: id,
            final_price,
            bidder: bidder.clone(),
        });
        Ok(settlement)
    }

    /// Withdraw the proceeds of a sold auction, destroying it and `cap`
    pub fn claim(
        &self,
        id: AuctionId,
        caller: &Principal,
        cap: AuctioneerCap,
    ) -> Result<Coin, Refused<AuctioneerCap>> {
        let closed = self.close_with(id, caller, cap, Auction::ensure_sold)?;
        let proceeds = match closed {
            Closed::Sold { proceeds } => proceeds,
            Closed::Cancelled { .. } => unreachable!("auction checked sold under its lock"),
        };

        info!(auction_id = %id, proceeds = proceeds.value(), "proceeds claimed");
        Ok(proceeds)
    }

    /// Cancel an unsold auction and take the item back
    pub fn stop(
        &self,
        id: AuctionId,
        caller: &Principal,
        cap: AuctioneerCap,
    ) -> Result<Item, Refused<AuctioneerCap>> {
        let closed = self.close_with(id, caller, cap, Auction::ensure_open)?;
        let item = match closed {
            Closed::Cancelled { item } => item,
            Closed::Sold { .. } => unreachable!("auction checked open under its lock"),
        };

        // the auction is gone, so nothing can be emitted for it after this
        info!(auction_id = %id, "auction stopped");
        self.notifier
            .notify(AuctionEvent::AuctionStopped { auction_id: id });
        Ok(item)
    }

    /// Authorize, run `check`, then take the auction apart
    ///
    /// The token is consumed only if every check passes.
    fn close_with(
        &self,
        id: AuctionId,
        caller: &Principal,
        cap: AuctioneerCap,
        check: impl FnOnce(&Auction<Item>) -> Result<(), AuctionError>,
    ) -> Result<Closed<Item>, Refused<AuctioneerCap>> {
        let slot = match self.slot(id) {
            Ok(slot) => slot,
            Err(e) => return Err(Refused::new(e, cap)),
        };
        let mut guard = slot.lock();

        let checked = match guard.as_ref() {
            None => Err(AuctionError::NotFound(id)),
            Some(auction) => self
                .authorize(auction, caller, &cap, TokenUse::Consume)
                .and_then(|()| check(auction)),
        };
        if let Err(e) = checked {
            debug!(auction_id = %id, %caller, error = %e, "close rejected");
            return Err(Refused::new(e, cap));
        }

        let closed = match guard.take() {
            Some(auction) => auction.close(),
            None => unreachable!("slot checked occupied under its lock"),
        };
        drop(guard);
        self.forget(id);
        drop(cap);

        Ok(closed)
    }

    pub fn present_price(&self, id: AuctionId) -> Result<Amount, AuctionError> {
        self.read(id, Auction::price)
    }

    pub fn proceeds(&self, id: AuctionId) -> Result<Amount, AuctionError> {
        self.read(id, Auction::proceeds)
    }

    pub fn has_ended(&self, id: AuctionId) -> Result<bool, AuctionError> {
        self.read(id, Auction::has_ended)
    }

    pub fn snapshot(&self, id: AuctionId) -> Result<AuctionSnapshot, AuctionError> {
        self.read(id, |auction| AuctionSnapshot {
            auction_id: auction.id(),
            auctioneer: auction.auctioneer().clone(),
            price: auction.price(),
            min_bid: auction.min_bid(),
            proceeds: auction.proceeds(),
            state: auction.state(),
        })
    }
}

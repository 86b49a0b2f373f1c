use crate::auth::Principal;
use crate::coin::Amount;
use crate::id::AuctionId;
use serde::Serialize;

/// A transition of some auction, as seen by observers
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum AuctionEvent {
    AuctionCreated {
        auction_id: AuctionId,
        maximal_price: Amount,
    },
    PriceUpdated {
        auction_id: AuctionId,
        new_price: Amount,
    },
    AuctionSucceeded {
        auction_id: AuctionId,
        final_price: Amount,
        bidder: Principal,
    },
    AuctionStopped {
        auction_id: AuctionId,
    },
}

impl AuctionEvent {
    pub fn auction_id(&self) -> AuctionId {
        match self {
            AuctionEvent::AuctionCreated { auction_id, .. }
            | AuctionEvent::PriceUpdated { auction_id, .. }
            | AuctionEvent::AuctionSucceeded { auction_id, .. }
            | AuctionEvent::AuctionStopped { auction_id } => *auction_id,
        }
    }
}

//! Auctioneer capability
//!
//! Holding an [`AuctioneerCap`] is what allows managing one auction. The
//! token can be handed to someone else by moving it, but it cannot be
//! cloned or built outside this crate.
use crate::id::{AuctionId, CapabilityId, ObjectId};

#[derive(Debug, PartialEq, Eq)]
pub struct AuctioneerCap {
    id: CapabilityId,
    auction: AuctionId,
}

impl AuctioneerCap {
    pub(crate) fn mint(auction: AuctionId) -> Self {
        Self {
            id: ObjectId::fresh(),
            auction,
        }
    }

    pub fn id(&self) -> CapabilityId {
        self.id
    }

    /// The auction this token manages; fixed at creation
    pub fn bound_auction(&self) -> AuctionId {
        self.auction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_token_gets_its_own_identity() {
        let auction = ObjectId::fresh();
        let a = AuctioneerCap::mint(auction);
        let b = AuctioneerCap::mint(auction);

        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), auction);
        assert_eq!(a.bound_auction(), auction);
    }
}

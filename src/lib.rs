//! Descending-price (Dutch) auctions with escrow
//!
//! An auctioneer puts an item up through [`AuctionHouse::create`] and gets
//! back the [`AuctioneerCap`] that alone may lower the price, stop the sale
//! or withdraw the proceeds. Anyone may [`AuctionHouse::bid`] the current
//! price; the first bid to get there wins the item and its payment stays
//! in escrow until claimed.
pub mod auction;
pub mod auction_house;
pub mod auth;
pub mod capability;
pub mod coin;
pub mod config;
pub mod event;
pub mod event_log;
pub mod id;
pub mod service;

pub use self::{
    auction::{AuctionError, AuctionState, Refused, Settlement},
    auction_house::{AuctionHouse, AuctionSnapshot},
    auth::{AuthPolicy, Principal},
    capability::AuctioneerCap,
    coin::{Amount, Coin, JoinOverflow, Treasury},
    event::AuctionEvent,
    id::{AuctionId, ObjectId},
};

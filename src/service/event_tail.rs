//! Event Tail
//!
//! Follows the notification log and reports every auction transition
//! through `tracing`, so that a running host leaves an audit trail.
use super::LogFollowerService;
use crate::event::AuctionEvent;
use crate::event_log::LogEvent;
use anyhow::Result;
use tracing::info;

pub const EVENT_TAIL_SERVICE_ID: &str = "event-tail";

#[derive(Debug, Default)]
pub struct EventTail {
    seen: u64,
}

impl EventTail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events handled so far
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl LogFollowerService for EventTail {
    fn get_log_progress_id(&self) -> String {
        EVENT_TAIL_SERVICE_ID.to_owned()
    }

    fn handle_event(&mut self, event: LogEvent) -> Result<()> {
        self.seen += 1;
        let offset = event.offset;
        match event.details {
            AuctionEvent::AuctionCreated {
                auction_id,
                maximal_price,
            } => info!(offset, %auction_id, maximal_price, "created"),
            AuctionEvent::PriceUpdated {
                auction_id,
                new_price,
            } => info!(offset, %auction_id, new_price, "price updated"),
            AuctionEvent::AuctionSucceeded {
                auction_id,
                final_price,
                bidder,
            } => info!(offset, %auction_id, final_price, %bidder, "succeeded"),
            AuctionEvent::AuctionStopped { auction_id } => info!(offset, %auction_id, "stopped"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;

    #[test]
    fn counts_what_it_handles() -> Result<()> {
        let mut tail = EventTail::new();
        let auction_id = ObjectId::fresh();

        tail.handle_event(LogEvent {
            offset: 0,
            details: AuctionEvent::AuctionStopped { auction_id },
        })?;

        assert_eq!(tail.seen(), 1);
        assert_eq!(tail.get_log_progress_id(), EVENT_TAIL_SERVICE_ID);
        Ok(())
    }
}

//! Notification sink and the event log behind it
//!
//! The auction house pushes every transition into a [`Notifier`] and
//! never looks at what happens next. [`InMemoryLog`] keeps them in an
//! offset-indexed log that services can follow with a [`Reader`].
mod in_memory;

pub use self::in_memory::*;

use crate::event::AuctionEvent;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub type Offset = u64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub offset: Offset,
    pub details: AuctionEvent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WithOffset<T> {
    /// Where the next read should start
    pub offset: Offset,
    pub data: T,
}

/// Fire-and-forget receiver of auction events
pub trait Notifier {
    fn notify(&self, event: AuctionEvent);
}

/// Drops everything
impl Notifier for () {
    fn notify(&self, _event: AuctionEvent) {}
}

pub trait Reader {
    /// Read up to `limit` events starting at `offset`
    ///
    /// If nothing is there yet and `timeout` is given, waits up to
    /// `timeout` for new events; `None` waits until one arrives.
    fn read(
        &self,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>>;

    fn get_start_offset(&self) -> Result<Offset>;
}

pub type SharedNotifier = Arc<dyn Notifier + Send + Sync + 'static>;
pub type SharedReader = Arc<dyn Reader + Send + Sync + 'static>;

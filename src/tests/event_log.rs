use std::time::Duration;

use crate::{
    event::AuctionEvent,
    event_log::{self, LogEvent, WithOffset},
    id::ObjectId,
};
use anyhow::Result;

#[test]
fn event_logs_sanity_check() -> Result<()> {
    let (notifier, event_reader) = event_log::new_in_memory_shared();

    let start_offset = event_reader.get_start_offset()?;

    assert_eq!(
        event_reader.read(start_offset, 0, Some(Duration::from_secs(0)))?,
        WithOffset {
            offset: start_offset,
            data: vec![]
        }
    );

    assert_eq!(
        event_reader.read(start_offset, 1, Some(Duration::from_secs(0)))?,
        WithOffset {
            offset: start_offset,
            data: vec![]
        }
    );

    let event = AuctionEvent::AuctionStopped {
        auction_id: ObjectId::fresh(),
    };
    notifier.notify(event.clone());

    assert_eq!(
        event_reader.read(start_offset + 1, 1, Some(Duration::from_secs(0)))?,
        WithOffset {
            offset: start_offset + 1,
            data: vec![]
        }
    );

    assert_eq!(
        event_reader.read(start_offset, 1, Some(Duration::from_secs(0)))?,
        WithOffset {
            offset: start_offset + 1,
            data: vec![LogEvent {
                offset: start_offset,
                details: event
            }]
        }
    );

    Ok(())
}

#[test]
fn blocked_reader_wakes_up_on_notify() -> Result<()> {
    let (notifier, event_reader) = event_log::new_in_memory_shared();
    let auction_id = ObjectId::fresh();

    let reader =
        std::thread::spawn(move || event_reader.read(0, 10, Some(Duration::from_secs(10))));
    std::thread::sleep(Duration::from_millis(50));
    notifier.notify(AuctionEvent::AuctionStopped { auction_id });

    let page = reader
        .join()
        .map_err(|_| anyhow::format_err!("reader panicked"))??;
    assert_eq!(page.offset, 1);
    assert_eq!(page.data[0].details.auction_id(), auction_id);
    Ok(())
}

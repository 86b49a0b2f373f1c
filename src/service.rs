pub mod event_tail;
pub mod http;

use crate::event_log::{self, LogEvent, WithOffset};
use anyhow::{bail, format_err, Result};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use tracing::{debug, error};

/// A service that handles events on the log
pub trait LogFollowerService: Send {
    fn get_log_progress_id(&self) -> String;

    fn handle_event(&mut self, event: LogEvent) -> Result<()>;
}

/// A service that is a loop that does something
pub trait LoopService: Send {
    fn run_iteration(&mut self) -> Result<()>;
}

/// Service execution control instance
///
/// All services are basically a loop, and we would like to be able to
/// gracefully terminate them, and handle and top-level error of any
/// of them by gracefully stopping everything else.
#[derive(Clone, Default)]
pub struct ServiceControl {
    stop_all: Arc<AtomicBool>,
}

impl ServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_all(&self) {
        self.stop_all.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stop_all.load(Ordering::SeqCst)
    }

    /// Follow `event_reader` from its start, `batch` events at a time
    pub fn spawn_log_follower(
        &self,
        mut service: impl LogFollowerService + 'static,
        event_reader: event_log::SharedReader,
        batch: usize,
    ) -> JoinHandle {
        let service_id = service.get_log_progress_id();
        let mut progress = match event_reader.get_start_offset() {
            Ok(offset) => offset,
            // just like the load happened on the spawned thread itself
            Err(e) => {
                return JoinHandle::new(
                    Arc::new(AtomicBool::new(false)),
                    thread::spawn(move || Err(e)),
                )
            }
        };

        self.spawn_loop_raw(move || {
            let WithOffset {
                offset: new_offset,
                data: events,
            } = event_reader.read(progress, batch, Some(Duration::from_secs(1)))?;

            for event in events {
                service.handle_event(event)?;
            }
            if new_offset != progress {
                debug!(service = %service_id, offset = new_offset, "log progress");
            }
            progress = new_offset;
            Ok(())
        })
    }

    pub fn spawn_loop(&self, mut service: impl LoopService + 'static) -> JoinHandle {
        self.spawn_loop_raw(move || service.run_iteration())
    }

    /// Start a new service as a loop, with a certain body
    ///
    /// This will take care of checking termination condition and
    /// handling any errors returned by `f`
    fn spawn_loop_raw<F>(&self, mut f: F) -> JoinHandle
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));

        JoinHandle::new(
            stop.clone(),
            thread::spawn({
                let stop_all = self.stop_all.clone();
                move || match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    while !stop.load(Ordering::SeqCst) && !stop_all.load(Ordering::SeqCst) {
                        if let Err(e) = f() {
                            error!(error = %e, "service failed, stopping all");
                            stop_all.store(true, Ordering::SeqCst);
                            return Err(e);
                        }
                    }
                    Ok(())
                })) {
                    Err(_e) => {
                        stop_all.store(true, Ordering::SeqCst);
                        bail!("service panicked");
                    }
                    Ok(res) => res,
                }
            }),
        )
    }
}

/// Simple thread join wrapper that stops and joins the thread on drop
pub struct JoinHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl JoinHandle {
    fn new(stop: Arc<AtomicBool>, handle: thread::JoinHandle<Result<()>>) -> Self {
        JoinHandle {
            stop,
            thread: Some(handle),
        }
    }

    fn join_mut(&mut self) -> Result<()> {
        if let Some(h) = self.thread.take() {
            h.join().map_err(|e| format_err!("join failed: {:?}", e))?
        } else {
            Ok(())
        }
    }

    pub fn join(mut self) -> Result<()> {
        self.join_mut()
    }
}

impl Drop for JoinHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.join_mut() {
            error!(error = %e, "service ended with an error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AuctionEvent;
    use crate::event_log::{InMemoryLog, Notifier};
    use crate::id::ObjectId;
    use std::sync::mpsc;

    struct Forward(mpsc::Sender<LogEvent>);

    impl LogFollowerService for Forward {
        fn get_log_progress_id(&self) -> String {
            "forward".to_owned()
        }

        fn handle_event(&mut self, event: LogEvent) -> Result<()> {
            self.0.send(event)?;
            Ok(())
        }
    }

    struct FailOnce;

    impl LoopService for FailOnce {
        fn run_iteration(&mut self) -> Result<()> {
            bail!("boom")
        }
    }

    #[test]
    fn log_follower_sees_events_in_order() -> Result<()> {
        let log = Arc::new(InMemoryLog::new());
        let svc_ctl = ServiceControl::new();
        let (tx, rx) = mpsc::channel();
        let handle = svc_ctl.spawn_log_follower(Forward(tx), log.clone(), 2);

        let auction_id = ObjectId::fresh();
        for new_price in [3, 2, 1] {
            log.notify(AuctionEvent::PriceUpdated {
                auction_id,
                new_price,
            });
        }

        let offsets: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).map(|e| e.offset))
            .collect::<Result<_, _>>()?;
        assert_eq!(offsets, vec![0, 1, 2]);

        svc_ctl.stop_all();
        handle.join()
    }

    #[test]
    fn failing_service_stops_everyone() {
        let svc_ctl = ServiceControl::new();
        let handle = svc_ctl.spawn_loop(FailOnce);

        assert!(handle.join().is_err());
        assert!(svc_ctl.is_stopping());
    }
}

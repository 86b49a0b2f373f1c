use super::*;
use parking_lot::{Condvar, Mutex};

pub struct InMemoryLog {
    inner: Mutex<Vec<AuctionEvent>>,
    condvar: Condvar,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            condvar: Condvar::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for InMemoryLog {
    fn notify(&self, event: AuctionEvent) {
        self.inner.lock().push(event);
        self.condvar.notify_all();
    }
}

impl Reader for InMemoryLog {
    fn read(
        &self,
        offset: Offset,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<WithOffset<Vec<LogEvent>>> {
        let offset_usize = usize::try_from(offset)?;

        let mut read = self.inner.lock();

        if read.len() <= offset_usize && limit > 0 {
            match timeout {
                Some(timeout) => {
                    self.condvar.wait_for(&mut read, timeout);
                }
                None => {
                    while read.len() <= offset_usize {
                        self.condvar.wait(&mut read);
                    }
                }
            }
        }

        let data: Vec<_> = read
            .get(offset_usize..)
            .unwrap_or_default()
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, e)| LogEvent {
                offset: offset + i as Offset,
                details: e.clone(),
            })
            .collect();

        Ok(WithOffset {
            offset: offset + data.len() as Offset,
            data,
        })
    }

    fn get_start_offset(&self) -> Result<Offset> {
        Ok(0)
    }
}

pub fn new_in_memory_shared() -> (SharedNotifier, SharedReader) {
    let log = Arc::new(InMemoryLog::new());
    (log.clone(), log)
}

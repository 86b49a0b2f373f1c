use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide source of object identities.
///
/// Starts at 1 so that a zeroed id never names a live object.
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// A globally unique identity of an auction or a capability token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocate a fresh id, never handed out before in this process
    pub fn fresh() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).map(Self),
            None => s.parse().map(Self),
        }
    }
}

pub type AuctionId = ObjectId;
pub type CapabilityId = ObjectId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_distinct_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| (0..100).map(|_| ObjectId::fresh()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread to finish"))
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();

        assert_eq!(all.len(), total);
    }

    #[test]
    fn display_parses_back() {
        let id = ObjectId::fresh();
        assert_eq!(id.to_string().parse::<ObjectId>(), Ok(id));
        assert_eq!("17".parse::<ObjectId>(), Ok(ObjectId(17)));
    }
}

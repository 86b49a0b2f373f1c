use crate::capability::AuctioneerCap;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Server-side custody of capability tokens
///
/// HTTP clients cannot hold a Rust value, so the token stays here and the
/// client gets an unguessable bearer string standing for it.
#[derive(Debug, Default)]
pub struct CapabilityVault {
    caps: Mutex<BTreeMap<String, AuctioneerCap>>,
}

impl CapabilityVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&self, cap: AuctioneerCap) -> String {
        let bearer = uuid::Uuid::new_v4().simple().to_string();
        self.caps.lock().insert(bearer.clone(), cap);
        bearer
    }

    /// Use the token without taking it out
    pub fn with<R>(&self, bearer: &str, f: impl FnOnce(&AuctioneerCap) -> R) -> Option<R> {
        self.caps.lock().get(bearer).map(f)
    }

    pub fn withdraw(&self, bearer: &str) -> Option<AuctioneerCap> {
        self.caps.lock().remove(bearer)
    }

    /// Put back a token an operation refused to consume
    pub fn restore(&self, bearer: String, cap: AuctioneerCap) {
        self.caps.lock().insert(bearer, cap);
    }

    pub fn len(&self) -> usize {
        self.caps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;

    #[test]
    fn withdraw_and_restore() {
        let vault = CapabilityVault::new();
        let auction = ObjectId::fresh();
        let bearer = vault.deposit(AuctioneerCap::mint(auction));

        assert_eq!(vault.with(&bearer, |cap| cap.bound_auction()), Some(auction));
        assert_eq!(vault.with("guess", |cap| cap.bound_auction()), None);

        let cap = vault.withdraw(&bearer).expect("deposited");
        assert!(vault.is_empty());
        vault.restore(bearer.clone(), cap);
        assert_eq!(vault.len(), 1);
    }
}

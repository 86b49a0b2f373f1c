//! Authorization of privileged auction operations
//!
//! One [`AuthPolicy`] is chosen when an [`AuctionHouse`](crate::AuctionHouse)
//! is built and every privileged entry point goes through
//! [`AuthPolicy::authorize`].
use crate::capability::AuctioneerCap;
use crate::id::{AuctionId, CapabilityId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A caller identity, as reported by the host
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPolicy {
    /// Possession of the auction's token is enough
    #[default]
    Capability,
    /// Only the recorded auctioneer may act
    Principal,
    /// Token and recorded auctioneer must both match
    Both,
}

/// What the auction remembers about who may manage it
#[derive(Clone, Debug)]
pub(crate) struct Grant {
    pub auction: AuctionId,
    pub capability: CapabilityId,
    pub auctioneer: Principal,
}

/// How a privileged call treats the token it is handed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TokenUse {
    /// Only looked at, as by `set_price`
    Present,
    /// Destroyed on success, as by `claim` and `stop`
    Consume,
}

impl AuthPolicy {
    pub(crate) fn authorize(
        self,
        grant: &Grant,
        caller: &Principal,
        cap: &AuctioneerCap,
        token_use: TokenUse,
    ) -> bool {
        let cap_ok = cap.bound_auction() == grant.auction && cap.id() == grant.capability;
        let principal_ok = *caller == grant.auctioneer;

        // a token is only ever destroyed together with its own auction
        let cap_required = token_use == TokenUse::Consume || self != AuthPolicy::Principal;
        let principal_required = self != AuthPolicy::Capability;

        (cap_ok || !cap_required) && (principal_ok || !principal_required)
    }
}

impl FromStr for AuthPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "capability" => AuthPolicy::Capability,
            "principal" => AuthPolicy::Principal,
            "both" => AuthPolicy::Both,
            other => anyhow::bail!("unknown auth policy: {other}"),
        })
    }
}

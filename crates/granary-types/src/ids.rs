//! Type-safe identifier wrappers.
//!
//! Players are identified by UUID v7 (time-ordered, minted when the player
//! first joins). Every other record is identified by a sequential `u64`
//! allocated from a per-collection counter held by the world aggregate, so
//! ids are monotonically increasing and survive a save/load round trip.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player.
///
/// The ordering of the inner UUID is the deterministic total order used to
/// break reputation ties in seat elections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PlayerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Generates a newtype wrapper around a sequential `u64` with standard derives.
macro_rules! define_seq_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Return the raw sequence number.
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

define_seq_id! {
    /// Unique identifier for a contract.
    ContractId
}

define_seq_id! {
    /// Unique identifier for a permit.
    PermitId
}

define_seq_id! {
    /// Unique identifier for a loan.
    LoanId
}

define_seq_id! {
    /// Unique identifier for an obligation.
    ObligationId
}

define_seq_id! {
    /// Unique identifier for a rumor record.
    RumorId
}

define_seq_id! {
    /// Unique identifier for an evidence dossier.
    EvidenceId
}

define_seq_id! {
    /// Unique identifier for a scry report.
    ScryReportId
}

define_seq_id! {
    /// Unique identifier for an intercepted message.
    InterceptId
}

define_seq_id! {
    /// Unique identifier for a relic.
    RelicId
}

define_seq_id! {
    /// Unique identifier for a civic project.
    ProjectId
}

define_seq_id! {
    /// Unique identifier for an entry in the event log.
    EventId
}

define_seq_id! {
    /// Unique identifier for a chat message.
    ChatMessageId
}

define_seq_id! {
    /// Unique identifier for a diplomatic message.
    DiplomaticMessageId
}

//! Row layout shared by every backend.
//!
//! The world is stored in two tables:
//!
//! ```text
//! world_meta (key, body)                               -- singletons
//! entities   (kind, id, position, generation, body)    -- one row per record
//! ```
//!
//! Bodies are JSON. `position` keeps the in-memory order of each collection
//! so a load reproduces it exactly. `generation` is bumped by every save;
//! rows left on an older generation after the upserts are stale and are
//! deleted in the same transaction.

use serde::Serialize;

use granary_core::GameSnapshot;
use granary_core::snapshot::{BudgetEntry, CooldownEntry, WorldMeta};
use granary_core::state::Counters;
use granary_types::Crisis;

use crate::error::DbError;

/// Layout version written to `world_meta`.
pub const SCHEMA_VERSION: u32 = 1;

/// Keys of the `world_meta` table.
pub mod key {
    /// Layout version.
    pub const SCHEMA_VERSION: &str = "schema_version";
    /// Save counter.
    pub const GENERATION: &str = "generation";
    /// World metadata, scalars, and policy.
    pub const META: &str = "meta";
    /// Next-id counters.
    pub const COUNTERS: &str = "counters";
    /// The crisis slot.
    pub const CRISIS: &str = "crisis";
}

/// One row of the `entities` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct EntityRow {
    /// Collection the record belongs to.
    pub kind: String,
    /// Natural id of the record within its collection.
    pub id: String,
    /// Index of the record within its collection.
    pub position: i64,
    /// JSON body.
    pub body: String,
}

/// One row of the `world_meta` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MetaRow {
    /// Singleton name.
    pub key: String,
    /// JSON body.
    pub body: String,
}

/// A snapshot flattened into rows.
#[derive(Debug, Clone, Default)]
pub struct EncodedWorld {
    /// Singleton rows, excluding the generation counter.
    pub meta: Vec<(&'static str, String)>,
    /// Entity rows in collection order.
    pub entities: Vec<EntityRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityKind {
    Player,
    Contract,
    Seat,
    Permit,
    Loan,
    Obligation,
    Rumor,
    Evidence,
    ScryReport,
    Intercept,
    Relic,
    Project,
    Event,
    Chat,
    Diplomatic,
    Cooldown,
    Budget,
}

impl EntityKind {
    const ALL: [Self; 17] = [
        Self::Player,
        Self::Contract,
        Self::Seat,
        Self::Permit,
        Self::Loan,
        Self::Obligation,
        Self::Rumor,
        Self::Evidence,
        Self::ScryReport,
        Self::Intercept,
        Self::Relic,
        Self::Project,
        Self::Event,
        Self::Chat,
        Self::Diplomatic,
        Self::Cooldown,
        Self::Budget,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Contract => "contract",
            Self::Seat => "seat",
            Self::Permit => "permit",
            Self::Loan => "loan",
            Self::Obligation => "obligation",
            Self::Rumor => "rumor",
            Self::Evidence => "evidence",
            Self::ScryReport => "scry_report",
            Self::Intercept => "intercept",
            Self::Relic => "relic",
            Self::Project => "project",
            Self::Event => "event",
            Self::Chat => "chat",
            Self::Diplomatic => "diplomatic",
            Self::Cooldown => "cooldown",
            Self::Budget => "budget",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

fn push_all<T: Serialize>(
    rows: &mut Vec<EntityRow>,
    kind: EntityKind,
    items: &[T],
    id: impl Fn(&T) -> String,
) -> Result<(), DbError> {
    for (position, item) in items.iter().enumerate() {
        rows.push(EntityRow {
            kind: kind.as_str().to_owned(),
            id: id(item),
            position: i64::try_from(position).unwrap_or(i64::MAX),
            body: serde_json::to_string(item)?,
        });
    }
    Ok(())
}

fn cooldown_id(entry: &CooldownEntry) -> String {
    format!("{}/{:?}", entry.player, entry.kind)
}

fn budget_id(entry: &BudgetEntry) -> String {
    format!("{}/{:?}", entry.player, entry.kind)
}

/// Flatten a snapshot into rows.
///
/// # Errors
///
/// Returns [`DbError::Serialization`] if any body fails to encode.
pub fn encode(snapshot: &GameSnapshot) -> Result<EncodedWorld, DbError> {
    let s = snapshot;
    let mut rows = Vec::new();
    push_all(&mut rows, EntityKind::Player, &s.players, |p| p.id.to_string())?;
    push_all(&mut rows, EntityKind::Contract, &s.contracts, |c| c.id.to_string())?;
    push_all(&mut rows, EntityKind::Seat, &s.seats, |seat| seat.kind.key().to_owned())?;
    push_all(&mut rows, EntityKind::Permit, &s.permits, |p| p.id.to_string())?;
    push_all(&mut rows, EntityKind::Loan, &s.loans, |l| l.id.to_string())?;
    push_all(&mut rows, EntityKind::Obligation, &s.obligations, |o| o.id.to_string())?;
    push_all(&mut rows, EntityKind::Rumor, &s.rumors, |r| r.id.to_string())?;
    push_all(&mut rows, EntityKind::Evidence, &s.evidence, |e| e.id.to_string())?;
    push_all(&mut rows, EntityKind::ScryReport, &s.scry_reports, |r| r.id.to_string())?;
    push_all(&mut rows, EntityKind::Intercept, &s.intercepts, |i| i.id.to_string())?;
    push_all(&mut rows, EntityKind::Relic, &s.relics, |r| r.id.to_string())?;
    push_all(&mut rows, EntityKind::Project, &s.projects, |p| p.id.to_string())?;
    push_all(&mut rows, EntityKind::Event, &s.events, |e| e.id.to_string())?;
    push_all(&mut rows, EntityKind::Chat, &s.chat, |m| m.id.to_string())?;
    push_all(&mut rows, EntityKind::Diplomatic, &s.diplomatic, |m| m.id.to_string())?;
    push_all(&mut rows, EntityKind::Cooldown, &s.cooldowns, cooldown_id)?;
    push_all(&mut rows, EntityKind::Budget, &s.budgets, budget_id)?;

    Ok(EncodedWorld {
        meta: vec![
            (key::SCHEMA_VERSION, SCHEMA_VERSION.to_string()),
            (key::META, serde_json::to_string(&s.meta)?),
            (key::COUNTERS, serde_json::to_string(&s.counters)?),
            (key::CRISIS, serde_json::to_string(&s.crisis)?),
        ],
        entities: rows,
    })
}

fn required<'a>(meta: &'a [MetaRow], name: &str) -> Result<&'a str, DbError> {
    meta.iter()
        .find(|row| row.key == name)
        .map(|row| row.body.as_str())
        .ok_or_else(|| DbError::SchemaMismatch {
            reason: format!("world_meta has no `{name}` row"),
        })
}

/// Parse the save counter, treating a missing row as zero.
pub fn generation_of(body: Option<&str>) -> i64 {
    body.and_then(|b| b.trim().parse().ok()).unwrap_or(0)
}

/// Rebuild a snapshot from rows. An empty `world_meta` means nothing has
/// been saved yet.
///
/// Entity rows must arrive grouped by kind in ascending `position`.
///
/// # Errors
///
/// Returns [`DbError::SchemaMismatch`] if the layout version differs or a
/// row is missing or of an unknown kind, and [`DbError::Serialization`] if
/// a body fails to decode.
pub fn decode(meta: &[MetaRow], entities: Vec<EntityRow>) -> Result<Option<GameSnapshot>, DbError> {
    if meta.is_empty() {
        return Ok(None);
    }
    let version = required(meta, key::SCHEMA_VERSION)?;
    if version.trim().parse::<u32>().ok() != Some(SCHEMA_VERSION) {
        return Err(DbError::SchemaMismatch {
            reason: format!("stored schema version {version}, expected {SCHEMA_VERSION}"),
        });
    }
    let world: WorldMeta = serde_json::from_str(required(meta, key::META)?)?;
    let counters: Counters = serde_json::from_str(required(meta, key::COUNTERS)?)?;
    let crisis: Option<Crisis> = serde_json::from_str(required(meta, key::CRISIS)?)?;

    let mut snap = GameSnapshot {
        meta: world,
        counters,
        crisis,
        players: Vec::new(),
        contracts: Vec::new(),
        seats: Vec::new(),
        permits: Vec::new(),
        loans: Vec::new(),
        obligations: Vec::new(),
        rumors: Vec::new(),
        evidence: Vec::new(),
        scry_reports: Vec::new(),
        intercepts: Vec::new(),
        relics: Vec::new(),
        projects: Vec::new(),
        events: Vec::new(),
        chat: Vec::new(),
        diplomatic: Vec::new(),
        cooldowns: Vec::new(),
        budgets: Vec::new(),
    };
    for row in entities {
        let kind = EntityKind::parse(&row.kind).ok_or_else(|| DbError::SchemaMismatch {
            reason: format!("unknown entity kind `{}`", row.kind),
        })?;
        let body = row.body.as_str();
        match kind {
            EntityKind::Player => snap.players.push(serde_json::from_str(body)?),
            EntityKind::Contract => snap.contracts.push(serde_json::from_str(body)?),
            EntityKind::Seat => snap.seats.push(serde_json::from_str(body)?),
            EntityKind::Permit => snap.permits.push(serde_json::from_str(body)?),
            EntityKind::Loan => snap.loans.push(serde_json::from_str(body)?),
            EntityKind::Obligation => snap.obligations.push(serde_json::from_str(body)?),
            EntityKind::Rumor => snap.rumors.push(serde_json::from_str(body)?),
            EntityKind::Evidence => snap.evidence.push(serde_json::from_str(body)?),
            EntityKind::ScryReport => snap.scry_reports.push(serde_json::from_str(body)?),
            EntityKind::Intercept => snap.intercepts.push(serde_json::from_str(body)?),
            EntityKind::Relic => snap.relics.push(serde_json::from_str(body)?),
            EntityKind::Project => snap.projects.push(serde_json::from_str(body)?),
            EntityKind::Event => snap.events.push(serde_json::from_str(body)?),
            EntityKind::Chat => snap.chat.push(serde_json::from_str(body)?),
            EntityKind::Diplomatic => snap.diplomatic.push(serde_json::from_str(body)?),
            EntityKind::Cooldown => snap.cooldowns.push(serde_json::from_str(body)?),
            EntityKind::Budget => snap.budgets.push(serde_json::from_str(body)?),
        }
    }
    Ok(Some(snap))
}

//! World aggregate, tick pipeline, and gameplay rules for the Granary
//! simulation.
//!
//! This crate owns the one mutable world and everything that changes it:
//! player actions, the fixed-order tick pipeline, the daily retention
//! cleanup, and the snapshot boundary persistence backends build on.
//!
//! # Modules
//!
//! - [`actions`] -- [`Action`] dispatch and per-subsystem handlers and tick
//!   passes (contracts, crisis, market, finance, institutions, intel,
//!   projects, travel, social, admin).
//! - [`catalog`] -- Exhaustive crisis, project, and relic definitions.
//! - [`cleanup`] -- Daily pruning and player retirement.
//! - [`clock`] -- World clock: absolute tick, day, subphase, wall-clock
//!   schedule.
//! - [`config`] -- Configuration loading from `granary-config.yaml` into
//!   strongly-typed structs.
//! - [`expiring`] -- [`Expiring`] records and the shared countdown sweep.
//! - [`game`] -- [`Game`], the lock-guarded shared handle.
//! - [`snapshot`] -- [`GameSnapshot`] capture and restore.
//! - [`state`] -- [`GameState`], the aggregate, and action outcomes.
//! - [`tick`] -- The tick pipeline and catch-up.
//!
//! [`Action`]: actions::Action
//! [`Expiring`]: expiring::Expiring
//! [`Game`]: game::Game
//! [`GameSnapshot`]: snapshot::GameSnapshot
//! [`GameState`]: state::GameState

pub mod actions;
pub mod catalog;
pub mod cleanup;
pub mod clock;
pub mod config;
pub mod error;
pub mod expiring;
pub mod game;
pub mod snapshot;
pub mod state;
pub mod tick;

pub use actions::{Action, DebtRef};
pub use error::CoreError;
pub use game::Game;
pub use snapshot::GameSnapshot;
pub use state::{ActionOutcome, GameState, Toast, ToastLevel};

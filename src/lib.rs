//! Dune Awakening harvest run ledger
//!
//! Tracks cooperative harvest runs and splits the refined output
//! (Melange, Stravidium Fiber, Plastanium) fairly between the players,
//! floored, with the remainder reported separately.

pub mod calculator;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod store;
pub mod tables;

pub use calculator::{
    compute_plastanium, compute_plastanium_with_stock, compute_spice, compute_stravidium_raw,
    compute_stravidium_raw as compute_plastanium_raw,
};
pub use error::{Result, RunError};
pub use ledger::{AdminCheck, AdminList, NoAdmins, RunLedger, RunUpdate, Stations};
pub use models::{Distribution, Identity, Run, RunId, RunKind, RunSnapshot};
pub use store::RunStore;
pub use tables::CraftingCost;

//! Data models for harvest runs and refinery results

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RunError;
use crate::tables::CraftingCost;

/// Raw or refined quantity. Water is in mL and may be fractional.
pub type Amount = Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefineryKind {
    LargeSpiceRefinery,
    MediumChemicalRefinery,
    LargeOreRefinery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    SpiceSand,
    SpiceMelange,
    StravidiumMass,
    StravidiumFiber,
    TitaniumOre,
    Plastanium,
    Water,
}

/// What a run harvests. Fixed when the run is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunKind {
    Spice,
    Stravidium,
    Plastanium,
}

impl RunKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RunKind::Spice => "spice",
            RunKind::Stravidium => "stravidium",
            RunKind::Plastanium => "plastanium",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunKind {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spice" => Ok(RunKind::Spice),
            "stravidium" => Ok(RunKind::Stravidium),
            "plastanium" => Ok(RunKind::Plastanium),
            other => Err(RunError::invalid(format!(
                "unknown run kind '{other}', expected spice|stravidium|plastanium"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(RunId)
            .map_err(|_| RunError::invalid(format!("'{s}' is not a run id")))
    }
}

/// A user of the command surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(pub String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// A cooperative harvest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub kind: RunKind,
    pub creator: Identity,
    pub players: Vec<String>,
    pub sand: Amount,
    pub strav_mass: Amount,
    pub titanium_ore: Amount,
    /// Refined fiber already on hand (plastanium runs only)
    pub fiber: Amount,
    pub last_calculation: Option<Distribution>,
}

impl Run {
    pub fn new(id: RunId, kind: RunKind, creator: Identity, players: Vec<String>) -> Self {
        Self {
            id,
            kind,
            creator,
            players,
            sand: Decimal::ZERO,
            strav_mass: Decimal::ZERO,
            titanium_ore: Decimal::ZERO,
            fiber: Decimal::ZERO,
            last_calculation: None,
        }
    }
}

/// Point-in-time copy of a run, safe to hand to callers
pub type RunSnapshot = Run;

/// Floored per-player share of a whole-unit total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub per_player: u64,
    /// Left unassigned; never given to a particular player
    pub remainder: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiceDistribution {
    pub sand: Amount,
    pub players: u32,
    pub processors: u32,
    pub melange_total: u64,
    pub melange_per_player: u64,
    pub remainder: u64,
    pub water_total: Amount,
    pub water_per_processor: Amount,
    pub time_seconds: Decimal,
}

/// Stravidium Mass -> Fiber at the Medium Chemical Refineries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberStage {
    pub chem_refineries: u32,
    pub fiber_total: u64,
    pub mass_consumed: Amount,
    pub mass_leftover: Amount,
    pub water_total: Amount,
    pub water_per_refinery: Amount,
    pub time_seconds: Decimal,
}

/// Fiber + Titanium -> Plastanium at the Large Ore Refineries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlastaniumStage {
    pub large_refineries: u32,
    pub plastanium_total: u64,
    pub fiber_used: Amount,
    pub fiber_leftover: Amount,
    pub titanium_used: Amount,
    pub titanium_leftover: Amount,
    pub water_total: Amount,
    pub water_per_refinery: Amount,
    pub time_seconds: Decimal,
}

/// Raw split: fiber is refined, titanium is shared unconverted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravidiumDistribution {
    pub strav_mass: Amount,
    pub titanium_ore: Amount,
    pub players: u32,
    pub cost: CraftingCost,
    pub fibers: FiberStage,
    pub fiber_per_player: u64,
    pub remainder: u64,
    pub titanium_per_player: u64,
    pub titanium_remainder: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlastaniumDistribution {
    pub strav_mass: Amount,
    pub titanium_ore: Amount,
    pub fiber_stock: Amount,
    pub players: u32,
    pub cost: CraftingCost,
    pub fibers: FiberStage,
    pub plastanium: PlastaniumStage,
    pub plastanium_per_player: u64,
    pub remainder: u64,
}

/// Result of calculating a run, by run kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    Spice(SpiceDistribution),
    Stravidium(StravidiumDistribution),
    Plastanium(PlastaniumDistribution),
}

impl Distribution {
    /// Per-player share and unassigned remainder of the final product
    pub fn share(&self) -> Share {
        match self {
            Distribution::Spice(d) => Share {
                per_player: d.melange_per_player,
                remainder: d.remainder,
            },
            Distribution::Stravidium(d) => Share {
                per_player: d.fiber_per_player,
                remainder: d.remainder,
            },
            Distribution::Plastanium(d) => Share {
                per_player: d.plastanium_per_player,
                remainder: d.remainder,
            },
        }
    }
}

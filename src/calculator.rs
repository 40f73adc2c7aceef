//! Refinery split calculator
//!
//! Stateless functions turning raw harvest amounts into refined totals,
//! floored per-player shares, water and processing time. Station counts
//! divide water and time linearly: batches are treated as if they could be
//! spread continuously across parallel refineries.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{Result, RunError};
use crate::models::{
    Amount, FiberStage, PlastaniumDistribution, PlastaniumStage, RefineryKind, ResourceKind,
    Share, SpiceDistribution, StravidiumDistribution,
};
use crate::tables::{
    CraftingCost, MELANGE_PER_BATCH, SAND_PER_BATCH, SECONDS_PER_FIBER, SECONDS_PER_PLASTANIUM,
    SECONDS_PER_SPICE_BATCH, WATER_PER_SPICE_BATCH,
};

/// Largest raw amount accepted. Keeps every product below Decimal's range.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000_000_000;

fn check_count(what: &str, n: u32) -> Result<()> {
    if n == 0 {
        return Err(RunError::invalid(format!("{what} must be at least 1")));
    }
    Ok(())
}

pub(crate) fn check_amount(what: &str, amount: Amount) -> Result<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(RunError::invalid(format!("{what} cannot be negative")));
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(RunError::invalid(format!("{what} exceeds {MAX_AMOUNT}")));
    }
    Ok(())
}

fn whole_units(value: Decimal) -> Result<u64> {
    value
        .floor()
        .to_u64()
        .ok_or_else(|| RunError::invalid(format!("{value} is out of range")))
}

/// Split a whole-unit total among players, floored
///
/// The remainder is reported and left unassigned.
pub fn split(total: u64, players: u32) -> Result<Share> {
    check_count("players", players)?;
    let players = u64::from(players);
    Ok(Share {
        per_player: total / players,
        remainder: total % players,
    })
}

/// Spice Sand -> Melange at Large Spice Refineries
pub fn compute_spice(sand: Amount, players: u32, processors: u32) -> Result<SpiceDistribution> {
    check_amount("spice sand", sand)?;
    check_count("players", players)?;
    check_count("processors", processors)?;

    let per_batch = Decimal::from(SAND_PER_BATCH);
    let melange_total = whole_units(sand * Decimal::from(MELANGE_PER_BATCH) / per_batch)?;
    let share = split(melange_total, players)?;
    let water_total = sand * Decimal::from(WATER_PER_SPICE_BATCH) / per_batch;
    let time_seconds =
        sand / per_batch * Decimal::from(SECONDS_PER_SPICE_BATCH) / Decimal::from(processors);

    Ok(SpiceDistribution {
        sand,
        players,
        processors,
        melange_total,
        melange_per_player: share.per_player,
        remainder: share.remainder,
        water_total: water_total.normalize(),
        water_per_processor: (water_total / Decimal::from(processors)).normalize(),
        time_seconds: time_seconds.normalize(),
    })
}

fn fiber_stage(strav_mass: Amount, chem_refineries: u32, cost: CraftingCost) -> Result<FiberStage> {
    let refinery = RefineryKind::MediumChemicalRefinery;
    let mass_per_fiber = cost.input_per_batch(refinery, ResourceKind::StravidiumMass);

    let fiber_total = whole_units(strav_mass / mass_per_fiber)?;
    let fibers = Decimal::from(fiber_total);
    let mass_consumed = fibers * mass_per_fiber;
    let water_total = fibers * cost.water_per_batch(refinery);
    let chem = Decimal::from(chem_refineries);

    Ok(FiberStage {
        chem_refineries,
        fiber_total,
        mass_consumed: mass_consumed.normalize(),
        mass_leftover: (strav_mass - mass_consumed).normalize(),
        water_total: water_total.normalize(),
        water_per_refinery: (water_total / chem).normalize(),
        time_seconds: (fibers * Decimal::from(SECONDS_PER_FIBER) / chem).normalize(),
    })
}

fn plastanium_stage(
    fiber_available: Amount,
    titanium_ore: Amount,
    large_refineries: u32,
    cost: CraftingCost,
) -> Result<PlastaniumStage> {
    let refinery = RefineryKind::LargeOreRefinery;
    let fiber_per_piece = cost.input_per_batch(refinery, ResourceKind::StravidiumFiber);
    let titanium_per_piece = cost.input_per_batch(refinery, ResourceKind::TitaniumOre);

    let by_fiber = whole_units(fiber_available / fiber_per_piece)?;
    let by_titanium = whole_units(titanium_ore / titanium_per_piece)?;
    let plastanium_total = by_fiber.min(by_titanium);

    let pieces = Decimal::from(plastanium_total);
    let fiber_used = pieces * fiber_per_piece;
    let titanium_used = pieces * titanium_per_piece;
    let water_total = pieces * cost.water_per_batch(refinery);
    let large = Decimal::from(large_refineries);

    Ok(PlastaniumStage {
        large_refineries,
        plastanium_total,
        fiber_used: fiber_used.normalize(),
        fiber_leftover: (fiber_available - fiber_used).normalize(),
        titanium_used: titanium_used.normalize(),
        titanium_leftover: (titanium_ore - titanium_used).normalize(),
        water_total: water_total.normalize(),
        water_per_refinery: (water_total / large).normalize(),
        time_seconds: (pieces * Decimal::from(SECONDS_PER_PLASTANIUM) / large).normalize(),
    })
}

/// Raw split: Mass -> Fiber at Medium Chemical Refineries, Titanium shared as ore
pub fn compute_stravidium_raw(
    strav_mass: Amount,
    titanium_ore: Amount,
    players: u32,
    chem_refineries: u32,
    cost: CraftingCost,
) -> Result<StravidiumDistribution> {
    check_amount("stravidium mass", strav_mass)?;
    check_amount("titanium ore", titanium_ore)?;
    check_count("players", players)?;
    check_count("chemical refineries", chem_refineries)?;

    let fibers = fiber_stage(strav_mass, chem_refineries, cost)?;
    let fiber_share = split(fibers.fiber_total, players)?;
    let titanium_share = split(whole_units(titanium_ore)?, players)?;

    Ok(StravidiumDistribution {
        strav_mass,
        titanium_ore,
        players,
        cost,
        fibers,
        fiber_per_player: fiber_share.per_player,
        remainder: fiber_share.remainder,
        titanium_per_player: titanium_share.per_player,
        titanium_remainder: titanium_share.remainder,
    })
}

/// Full craft: Mass -> Fiber, then Fiber + Titanium -> Plastanium
pub fn compute_plastanium(
    strav_mass: Amount,
    titanium_ore: Amount,
    players: u32,
    large_refineries: u32,
    chem_refineries: u32,
    cost: CraftingCost,
) -> Result<PlastaniumDistribution> {
    compute_plastanium_with_stock(
        strav_mass,
        Decimal::ZERO,
        titanium_ore,
        players,
        large_refineries,
        chem_refineries,
        cost,
    )
}

/// Like [`compute_plastanium`], with refined fiber already on hand added to
/// the fiber stage output.
pub fn compute_plastanium_with_stock(
    strav_mass: Amount,
    fiber_stock: Amount,
    titanium_ore: Amount,
    players: u32,
    large_refineries: u32,
    chem_refineries: u32,
    cost: CraftingCost,
) -> Result<PlastaniumDistribution> {
    check_amount("stravidium mass", strav_mass)?;
    check_amount("stravidium fiber", fiber_stock)?;
    check_amount("titanium ore", titanium_ore)?;
    check_count("players", players)?;
    check_count("large ore refineries", large_refineries)?;
    check_count("chemical refineries", chem_refineries)?;

    let fibers = fiber_stage(strav_mass, chem_refineries, cost)?;
    let fiber_available = Decimal::from(fibers.fiber_total) + fiber_stock;
    let plastanium = plastanium_stage(fiber_available, titanium_ore, large_refineries, cost)?;
    let share = split(plastanium.plastanium_total, players)?;

    Ok(PlastaniumDistribution {
        strav_mass,
        titanium_ore,
        fiber_stock,
        players,
        cost,
        fibers,
        plastanium,
        plastanium_per_player: share.per_player,
        remainder: share.remainder,
    })
}

/// Format seconds as "1h 2m 3s", or "2m 3s" under an hour
pub fn format_duration(seconds: Decimal) -> String {
    let total = seconds.round().to_u64().unwrap_or(0);
    let (h, rem) = (total / 3600, total % 3600);
    let (m, s) = (rem / 60, rem % 60);
    if h > 0 {
        format!("{h}h {m}m {s}s")
    } else {
        format!("{m}m {s}s")
    }
}

fn cost_label(cost: CraftingCost) -> &'static str {
    match cost {
        CraftingCost::Standard => "OFF",
        CraftingCost::Landsraad => "ON",
    }
}

impl fmt::Display for SpiceDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Spice ===")?;
        writeln!(f, "Spice Sand: {:.0}", self.sand)?;
        writeln!(f, "Players: {} | Spice Refineries: {}", self.players, self.processors)?;
        writeln!(f)?;
        writeln!(f, "Total Melange: {}", self.melange_total)?;
        writeln!(f, "Melange per Player (floored): {}", self.melange_per_player)?;
        writeln!(f, "Unallocated Remainder: {}", self.remainder)?;
        writeln!(f)?;
        writeln!(f, "Total Water: {:.2}", self.water_total)?;
        writeln!(f, "Water per Refinery: {:.2}", self.water_per_processor)?;
        writeln!(f, "Processing Time (parallel): {}", format_duration(self.time_seconds))?;
        Ok(())
    }
}

impl fmt::Display for FiberStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fiber Stage (Medium Chemical Refinery x{})", self.chem_refineries)?;
        writeln!(f, "  Fibers: {}", self.fiber_total)?;
        writeln!(f, "  Water per Chem Refinery: {:.0} mL", self.water_per_refinery)?;
        writeln!(f, "  Time per Chem Refinery: {}", format_duration(self.time_seconds))?;
        writeln!(f, "  Raw Stravidium Consumed: {:.2}", self.mass_consumed)?;
        writeln!(f, "  Raw Stravidium Leftover: {:.2}", self.mass_leftover)?;
        Ok(())
    }
}

impl fmt::Display for PlastaniumStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Plastanium Stage (Large Ore Refinery x{})", self.large_refineries)?;
        writeln!(f, "  Water per Large Ore Refinery: {:.0} mL", self.water_per_refinery)?;
        writeln!(f, "  Time per Large Ore Refinery: {}", format_duration(self.time_seconds))?;
        writeln!(f, "  Fiber Used: {:.2}", self.fiber_used)?;
        writeln!(f, "  Fiber Leftover: {:.2}", self.fiber_leftover)?;
        writeln!(f, "  Titanium Used: {:.2}", self.titanium_used)?;
        writeln!(f, "  Titanium Leftover: {:.2}", self.titanium_leftover)?;
        Ok(())
    }
}

impl fmt::Display for StravidiumDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Stravidium (raw split) ===")?;
        writeln!(
            f,
            "Stravidium Mass: {:.0} | Titanium Ore: {:.0}",
            self.strav_mass, self.titanium_ore
        )?;
        writeln!(f, "Players: {}", self.players)?;
        writeln!(f, "Landsraad -25% crafting costs: {}", cost_label(self.cost))?;
        writeln!(f)?;
        write!(f, "{}", self.fibers)?;
        writeln!(f)?;
        writeln!(f, "Fibers per Player (floored): {}", self.fiber_per_player)?;
        writeln!(f, "Unallocated Fiber Remainder: {}", self.remainder)?;
        writeln!(f, "Titanium Ore per Player (floored): {}", self.titanium_per_player)?;
        writeln!(f, "Unallocated Titanium Remainder: {}", self.titanium_remainder)?;
        Ok(())
    }
}

impl fmt::Display for PlastaniumDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Plastanium (craft) ===")?;
        writeln!(
            f,
            "Stravidium Mass: {:.0} | Titanium Ore: {:.0}",
            self.strav_mass, self.titanium_ore
        )?;
        if !self.fiber_stock.is_zero() {
            writeln!(f, "Fiber on hand: {:.0}", self.fiber_stock)?;
        }
        writeln!(f, "Players: {}", self.players)?;
        writeln!(f, "Landsraad -25% crafting costs: {}", cost_label(self.cost))?;
        writeln!(f)?;
        write!(f, "{}", self.fibers)?;
        writeln!(f)?;
        write!(f, "{}", self.plastanium)?;
        writeln!(f)?;
        writeln!(f, "Total Plastanium: {}", self.plastanium.plastanium_total)?;
        writeln!(f, "Plastanium per Player (floored): {}", self.plastanium_per_player)?;
        writeln!(f, "Unallocated Remainder: {}", self.remainder)?;
        Ok(())
    }
}

//! Refinery conversion ratios
//!
//! Reference values for the refineries a harvest run feeds. Changing any of
//! these changes every split the ledger reports.

use rust_decimal::Decimal;

use crate::models::{RefineryKind, ResourceKind};

// Large Spice Refinery, per batch
pub const SAND_PER_BATCH: u64 = 10_000;
pub const MELANGE_PER_BATCH: u64 = 200;
pub const WATER_PER_SPICE_BATCH: u64 = 75_000;
pub const SECONDS_PER_SPICE_BATCH: u64 = 2_700;

// Medium Chemical Refinery, per fiber
pub const MASS_PER_FIBER: u64 = 3;
pub const WATER_PER_FIBER_ML: u64 = 100;
pub const SECONDS_PER_FIBER: u64 = 10;

// Large Ore Refinery, per plastanium
pub const FIBER_PER_PLASTANIUM: u64 = 1;
pub const TITANIUM_PER_PLASTANIUM: u64 = 4;
pub const WATER_PER_PLASTANIUM_ML: u64 = 1_250;
pub const SECONDS_PER_PLASTANIUM: u64 = 20;

/// Inputs, output, water and time for one batch of a refinery
#[derive(Debug, Clone, PartialEq)]
pub struct RefineryRatio {
    pub refinery: RefineryKind,
    pub inputs: Vec<(ResourceKind, Decimal)>,
    pub output: (ResourceKind, Decimal),
    pub water_per_batch: Decimal,
    pub seconds_per_batch: Decimal,
}

impl RefineryKind {
    /// Reference ratio for one batch at standard crafting cost
    pub fn ratio(self) -> RefineryRatio {
        match self {
            RefineryKind::LargeSpiceRefinery => RefineryRatio {
                refinery: self,
                inputs: vec![(ResourceKind::SpiceSand, SAND_PER_BATCH.into())],
                output: (ResourceKind::SpiceMelange, MELANGE_PER_BATCH.into()),
                water_per_batch: WATER_PER_SPICE_BATCH.into(),
                seconds_per_batch: SECONDS_PER_SPICE_BATCH.into(),
            },
            RefineryKind::MediumChemicalRefinery => RefineryRatio {
                refinery: self,
                inputs: vec![(ResourceKind::StravidiumMass, MASS_PER_FIBER.into())],
                output: (ResourceKind::StravidiumFiber, Decimal::ONE),
                water_per_batch: WATER_PER_FIBER_ML.into(),
                seconds_per_batch: SECONDS_PER_FIBER.into(),
            },
            RefineryKind::LargeOreRefinery => RefineryRatio {
                refinery: self,
                inputs: vec![
                    (ResourceKind::StravidiumFiber, FIBER_PER_PLASTANIUM.into()),
                    (ResourceKind::TitaniumOre, TITANIUM_PER_PLASTANIUM.into()),
                ],
                output: (ResourceKind::Plastanium, Decimal::ONE),
                water_per_batch: WATER_PER_PLASTANIUM_ML.into(),
                seconds_per_batch: SECONDS_PER_PLASTANIUM.into(),
            },
        }
    }
}

/// Crafting cost tier applied at the chemical and ore refineries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CraftingCost {
    #[default]
    Standard,
    /// Landsraad bonus: crafting inputs and water cost 75%
    Landsraad,
}

impl CraftingCost {
    /// Multiplier on crafting inputs and water. Time is never discounted.
    pub fn factor(self) -> Decimal {
        match self {
            CraftingCost::Standard => Decimal::ONE,
            CraftingCost::Landsraad => Decimal::new(75, 2),
        }
    }

    /// Input quantity of `resource` needed per batch of `refinery` at this cost tier.
    ///
    /// Spice refining is never discounted.
    pub fn input_per_batch(self, refinery: RefineryKind, resource: ResourceKind) -> Decimal {
        let ratio = refinery.ratio();
        let base = ratio
            .inputs
            .iter()
            .find(|(r, _)| *r == resource)
            .map(|(_, qty)| *qty)
            .unwrap_or(Decimal::ZERO);
        base * self.factor_for(refinery)
    }

    /// Water per batch of `refinery` at this cost tier
    pub fn water_per_batch(self, refinery: RefineryKind) -> Decimal {
        refinery.ratio().water_per_batch * self.factor_for(refinery)
    }

    fn factor_for(self, refinery: RefineryKind) -> Decimal {
        match refinery {
            RefineryKind::LargeSpiceRefinery => Decimal::ONE,
            _ => self.factor(),
        }
    }
}

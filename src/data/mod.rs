pub mod cp_multiplier;
pub mod family;
pub mod registry;
pub mod species;
pub mod validate;

pub use cp_multiplier::{CpMultiplierEntry, CpMultiplierTable, STANDARD_CP_MULTIPLIERS};
pub use family::{EvolutionLine, FamilyTable};
pub use registry::DataRegistry;
pub use species::{SpeciesBaseStats, SpeciesTable};

pub mod energy_supply;
pub mod heating_systems;
pub mod space_heat_demand;
pub mod units;

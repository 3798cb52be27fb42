pub mod heating_limit;

pub mod heat_pump_cop;

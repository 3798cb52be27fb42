use crate::core::energy_supply::utilization_factor::UtilizationFactorError;
use crate::core::heating_systems::heat_pump_cop::CopError;
use crate::core::space_heat_demand::heating_limit::HeatDemandError;
use crate::era5_request::Era5RequestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PvcompareError {
    #[error("Input was considered invalid due to error: {0:#}")]
    InvalidInput(#[from] anyhow::Error),
    #[error("Error identified during calculation: {0}")]
    FailureInCalculation(#[from] CalculationError),
    #[error("Error while writing output: {0:#}")]
    ErrorInOutput(anyhow::Error),
}

/// Any of the errors the numerical core raises.
#[derive(Debug, Error)]
pub enum CalculationError {
    #[error(transparent)]
    UtilizationFactor(#[from] UtilizationFactorError),
    #[error(transparent)]
    HeatDemand(#[from] HeatDemandError),
    #[error(transparent)]
    Cop(#[from] CopError),
    #[error(transparent)]
    Era5Request(#[from] Era5RequestError),
}

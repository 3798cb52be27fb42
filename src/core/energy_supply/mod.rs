pub mod regression;
pub mod utilization_factor;

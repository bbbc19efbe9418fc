pub mod analyze;
pub mod diversification;
pub mod performance;
pub mod xirr;

pub mod capm;
pub mod cumulative;
pub mod engine;
pub mod normalize;
pub mod regression;
pub mod returns;
pub mod risk;
pub mod stats;
pub mod types;

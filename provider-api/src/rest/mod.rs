pub mod chart;
pub mod client;
pub mod endpoint;
pub mod generate;
pub mod params;
pub mod query;

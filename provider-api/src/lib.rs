pub mod error;
pub mod grading;
pub mod rest;

pub use error::Error;
pub use rest::{chart::fetch_candles, client::RestClient, generate::generate_text};

pub const DEFAULT_CHART_URL: &str = "https://query1.finance.yahoo.com/";
pub const DEFAULT_GENERATE_URL: &str = "https://generativelanguage.googleapis.com/";

pub mod candle;
pub mod interval;

pub use candle::Candle;
pub use interval::Interval;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid interval: {0}")]
    IntervalError(String),
}

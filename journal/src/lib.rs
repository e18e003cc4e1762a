pub mod backfill;
pub mod backup;
pub mod batch;
pub mod coach;
pub mod error;
pub mod import;
pub mod repository;
pub mod store;
pub mod symbols;
pub mod window;

pub use error::Error;

pub mod price_repository;

pub use price_repository::SqlitePriceStore;

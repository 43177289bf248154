pub mod bundle_persistence;
pub mod csv_price_store;
pub mod persistence;
pub mod repositories;

pub use bundle_persistence::JsonBundleStore;
pub use csv_price_store::CsvPriceStore;
pub use persistence::{Database, SqlitePriceStore};
pub use repositories::{InMemoryBundleStore, InMemoryPriceStore};

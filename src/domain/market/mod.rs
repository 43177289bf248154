pub mod instrument;
pub mod price_series;

pub use instrument::{FetchOrder, InstrumentId};
pub use price_series::{PricePoint, PriceSeries};

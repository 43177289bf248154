pub mod signal;

pub use signal::{
    PredictionRecord, PriceAnchors, Recommendation, ReferenceBasis, Signal, Trend, TrendAnalysis,
};

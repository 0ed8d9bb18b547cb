pub mod bar;
pub mod loader;
pub mod yahoo;

pub use bar::{Bar, PriceSeries, SeriesKey};
pub use loader::{MarketDataClient, SeriesLoader};

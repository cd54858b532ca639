//! Remote source access: the World Bank client, response decoding and request
//! throttling.

pub mod throttle;
pub mod worldbank;

pub use throttle::RateLimiter;
pub use worldbank::{ParsedSeries, SeriesSource, WorldBankClient, parse_series, series_url};

//! External data source contract. The engine never hard-codes a vendor:
//! [`SecondDataSource`] is the seam the orchestrator fetches through, and
//! [`MinuteBarSource`] is the seam the validator cross-checks against.

pub mod http;
pub mod source;

pub use http::HttpSecondDataSource;
pub use source::{MinuteBar, MinuteBarSource, PriceMode, ProviderError, RollMapping, SecondDataSource};

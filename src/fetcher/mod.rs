pub mod catalog_fetcher;
pub mod transport;

pub use catalog_fetcher::*;
pub use transport::*;

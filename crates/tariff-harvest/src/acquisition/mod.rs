//! Network side of the harvester: the page fetcher and the request pacer.

pub mod http_client;
pub mod pacer;

pub use http_client::{HttpFetcher, PageSource, RawPage};
pub use pacer::Pacer;

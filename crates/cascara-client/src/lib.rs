#[cfg(feature = "browser")]
pub mod browser;
pub mod http;
pub mod registry;
pub mod selector;

#[cfg(feature = "browser")]
pub use browser::BrowserStrategy;
pub use http::HttpStrategy;
pub use registry::FetcherRegistry;
pub use selector::CssFieldExtractor;

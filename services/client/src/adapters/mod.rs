pub mod file_store;
pub mod http;

pub use file_store::FileStorage;
pub use http::HttpBackend;

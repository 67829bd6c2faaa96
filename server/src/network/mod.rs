//! Network front door of the server.

mod http;

pub use http::HttpServer;

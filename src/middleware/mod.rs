// Start of file: /src/middleware/mod.rs

/*
* Request pipeline stages shared by every route.
*/

pub mod body_parser;
pub mod error_handler;
pub mod request_logger;
pub mod security_headers;
pub mod static_assets;

// End of file: /src/middleware/mod.rs

// Start of file: /src/core/mod.rs

/*
* Application assembly, logging, lifecycle management and the server entry point.
*/

pub mod app;
pub mod lifecycle;
pub mod logging;
pub mod server;

// End of file: /src/core/mod.rs

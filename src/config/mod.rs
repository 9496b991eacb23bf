// Start of file: /src/config/mod.rs

/*
* Startup configuration read from the environment, and the state bundle
* every middleware and handler receives.
*/

pub mod environment;
pub mod state;

// End of file: /src/config/mod.rs

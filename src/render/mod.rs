// Start of file: /src/render/mod.rs

/*
    * Server-side rendering: the rendering build abstraction, the page routes,
    * the development asset server and the catch-all SSR handler.
*/

pub mod build;
pub mod dev_server;
pub mod handler;
pub mod pages;

// End of file: /src/render/mod.rs

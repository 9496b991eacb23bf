pub mod postgres_service;

pub use postgres_service::Database;

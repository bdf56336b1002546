pub mod app;
pub mod config;
pub mod docs;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod persona;
pub mod routes;
pub mod state;
pub mod sweeper;

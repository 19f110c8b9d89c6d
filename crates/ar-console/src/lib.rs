//! Agent router front end: configuration, wiring, and the line console.

pub mod app;
pub mod config;
pub mod console;

pub use app::App;
pub use config::{AppConfig, HandlerKind, HandlerSpec};

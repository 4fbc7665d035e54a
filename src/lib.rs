pub mod cache;
pub mod config;
pub mod emitter;
pub mod geo;
pub mod plugin;
pub mod sink;

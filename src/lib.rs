pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod model;
pub mod options;
pub mod plugin;

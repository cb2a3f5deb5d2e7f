// Crate root library declaration and module exports.
pub mod aggregator;
pub mod background;
pub mod cli;
pub mod client;
pub mod color_utils;
pub mod config;
pub mod context;
pub mod controller;
pub mod model;
pub mod publish;
pub mod render;

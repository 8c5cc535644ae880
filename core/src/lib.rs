pub mod config;
pub mod geometry;
pub mod kernel;
pub mod snap;
pub mod view;
pub mod visual;

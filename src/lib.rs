pub mod agent;
pub mod config;
pub mod controller;
pub mod image;
pub mod render;
pub mod server;
pub mod session;

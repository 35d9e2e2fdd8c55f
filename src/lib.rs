pub mod cli;
pub mod config;
pub mod horde;
pub mod persistence;
pub mod simulation;
pub mod world;

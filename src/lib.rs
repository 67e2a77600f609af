//! ISS position recorder
//!
//! Polls the current position of the International Space Station, validates
//! the coordinates and stores them in PostgreSQL or prints them.

pub mod cli;
pub mod config;
pub mod database;
pub mod errors;
pub mod fetcher;
pub mod models;
pub mod normalizer;
pub mod poller;
pub mod sink;

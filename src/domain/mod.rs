//! Domain layer
//!
//! Pure data model and core logic of the simulated peripheral. Nothing in
//! here talks to a radio directly; the radio is reached through the traits in
//! [`peripheral`].

pub mod advertising;
pub mod catalog;
pub mod error;
pub mod models;
pub mod peripheral;
pub mod session;
pub mod settings;
pub mod simulator;
pub mod state_machine;
pub mod value_store;

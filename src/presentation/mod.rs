//! Presentation layer
//!
//! egui operator form. It only sends commands to the control thread and
//! renders what comes back.

pub mod app;
pub mod components;
pub mod tabs;
pub mod theme;

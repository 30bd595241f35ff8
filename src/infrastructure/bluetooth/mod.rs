//! Bluetooth Module
//!
//! Radio backends and the control loop that drives the simulator.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  SimulatorCommand   ┌────────────────────┐
//! │  egui form   │ ──────────────────► │ PeripheralService  │
//! │ (UI thread)  │ ◄────────────────── │  (control thread)  │
//! └──────────────┘      AppEvent       └─────────┬──────────┘
//!                                                │ TransportEvent
//!                                  ┌─────────────┴─────────────┐
//!                                  ▼                           ▼
//!                          ┌──────────────┐           ┌──────────────┐
//!                          │ VirtualRadio │           │  WinRtRadio  │
//!                          │ (any host)   │           │  (Windows)   │
//!                          └──────────────┘           └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`service`] - Control thread, command loop and UI notifications
//! - [`virtual_radio`] - In-process radio with a simulated central
//! - `winrt` - Windows GATT server and advertisement publisher

pub mod service;
#[cfg_attr(windows, allow(dead_code))]
pub mod virtual_radio;
#[cfg(windows)]
pub mod winrt;

pub use service::spawn_control_thread;

/// Radio backend used by the application on this host
#[cfg(windows)]
pub type PlatformRadio = winrt::WinRtRadio;
#[cfg(not(windows))]
pub type PlatformRadio = virtual_radio::VirtualRadio;

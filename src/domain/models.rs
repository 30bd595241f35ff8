//! Messages exchanged between the operator form and the control thread

use crate::domain::advertising::AdvertisingData;
use crate::domain::catalog::CharacteristicId;

/// Advertising state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralState {
    /// No advertising (a controller may still exist from an earlier run)
    Idle,
    Advertising,
    /// A central is attached; the transport has stopped advertising
    Connected,
}

impl PeripheralState {
    pub fn is_running(self) -> bool {
        self != Self::Idle
    }
}

/// Requests from the operator form to the control thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatorCommand {
    /// Edit committed for one field
    ValueChanged(CharacteristicId, String),
    ToggleAdvertising,
    /// Stop advertising and release the GATT session
    Shutdown,
}

/// Notifications from the control thread to the operator form
#[derive(Debug, Clone)]
pub enum AppEvent {
    PeripheralState(PeripheralState),
    /// "Disconnected" or "Connected to <address>"
    StatusText(String),
    Advertisement(Option<AdvertisingData>),
    /// Advertising start refused; must be acknowledged by the operator
    StartRejected(String),
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Simulator,
    Central,
    Settings,
}

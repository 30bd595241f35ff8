pub mod central;
pub mod settings;
pub mod simulator;

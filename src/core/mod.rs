pub mod colors;
pub mod display;
pub mod frame;
pub mod monitor;
pub mod telemetry;

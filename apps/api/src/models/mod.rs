pub mod project;
pub mod settings;
pub mod suggestion;
pub mod telemetry;

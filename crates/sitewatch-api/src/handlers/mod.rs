pub mod alerts;
pub mod changes;
pub mod targets;

//! Rendering: block lifecycle, load orchestration, sizing and observer wiring

pub mod block;
pub mod layout;
pub mod observers;
pub mod orchestrator;

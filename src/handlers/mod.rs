// src/handlers/mod.rs

pub mod analysis;
pub mod exams;
pub mod optical_forms;
pub mod probes;
pub mod uploads;

// src/models/mod.rs

pub mod analysis;
pub mod exam;
pub mod optical_form;
pub mod student;

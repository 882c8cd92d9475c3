// src/services/mod.rs
pub mod amortization;
pub mod cache;
pub mod categories;
pub mod db;
pub mod format;
pub mod property_tax;
pub mod rankings;
pub mod scheduler;
pub mod upstream;

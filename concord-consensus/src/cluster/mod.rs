pub mod builder;
pub mod core;
pub mod participant;

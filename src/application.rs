//! Application layer - batch orchestration on top of domain + infrastructure

pub mod importer;
pub mod scanner;
pub mod sweeper;

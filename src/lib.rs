pub mod classify;
pub mod cli;
pub mod engine;
pub mod policy;
pub mod report;
pub mod runner;
pub mod status;
pub mod tree;
pub mod types;

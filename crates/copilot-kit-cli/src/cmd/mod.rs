pub mod config;
pub mod instructions;
pub mod lint;
pub mod ruleset;
pub mod setup_steps;

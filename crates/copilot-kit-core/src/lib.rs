pub mod candidate;
pub mod config;
pub mod document;
pub mod environment;
pub mod error;
pub mod frontmatter;
pub mod github;
pub mod instructions;
pub mod io;
pub mod lint;
pub mod paths;
pub mod pins;
pub mod ruleset;
pub mod setup_steps;
pub mod synth;
pub mod update;
pub mod workflow_scan;

pub use error::{KitError, Result};

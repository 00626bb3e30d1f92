//! Subcommand implementations

pub mod collect;
pub mod extract;
pub mod split;
pub mod train;

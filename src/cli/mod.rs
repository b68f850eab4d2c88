//! CLI command handling

pub mod inspect;
pub mod output;
pub mod run;

pub use inspect::*;
pub use output::*;
pub use run::*;

//! Settings come from a TOML file layered with `SESSIONGATE__*` environment
//! variables. See `bin/settings_demo.rs` for a binary that prints the result.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;

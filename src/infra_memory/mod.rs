//! Process-local adapters. Used by the `memory` auth backend and by tests;
//! nothing here survives a restart.

mod failed_login_repo_memory;
mod manual_clock;
mod refresh_token_repo_memory;
mod repo_tx_memory;
mod revocation_cache_memory;
mod user_repo_memory;

pub use failed_login_repo_memory::*;
pub use manual_clock::*;
pub use refresh_token_repo_memory::*;
pub use repo_tx_memory::*;
pub use revocation_cache_memory::*;
pub use user_repo_memory::*;

// store

mod revocation_cache;

pub use revocation_cache::*;

// repo

mod failed_login_repo;
mod refresh_token_repo;
mod user_repo;

mod repo_tx;

pub use failed_login_repo::*;
pub use refresh_token_repo::*;
pub use user_repo::*;

pub use repo_tx::*;

// time

mod clock;

pub use clock::*;

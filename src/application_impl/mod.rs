mod auth_service_impl;
mod credential_hasher;
mod refresh_secret;
mod token_codec_jwt;

pub use auth_service_impl::*;
pub use credential_hasher::*;
pub use refresh_secret::*;
pub use token_codec_jwt::*;

mod failed_login;
mod session;
mod token;
mod user;

pub use failed_login::*;
pub use session::*;
pub use token::*;
pub use user::*;

mod guard;
mod token;

pub use guard::{current_user, require_admin, AUTHORIZATION, BEARER};
pub use token::AuthToken;

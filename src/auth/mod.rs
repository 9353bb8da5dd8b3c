pub mod middleware;
pub mod ownership;
pub mod password;
pub mod tokens;

pub use middleware::AuthUser;
pub use ownership::{ensure_owner, Owned};
pub use tokens::TokenKeys;

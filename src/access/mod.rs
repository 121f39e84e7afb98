pub mod identity;
pub mod scope;

pub use identity::{CurrentUser, IdentityProvider, Role, StaticTokenProvider};
pub use scope::AccessScope;

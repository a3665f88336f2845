//! `petstore-auth` — authentication/authorization boundary.
//!
//! Token signing, role → permission resolution, access policies and password
//! hashing. Decoupled from HTTP; storage is reached only through [`RoleSource`].

pub mod authorize;
pub mod claims;
pub mod password;
pub mod permissions;
pub mod resolver;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::{authorize, AccessPolicy, AuthzError};
pub use claims::{Actor, IdentityClaims};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::{Permission, PermissionSet};
pub use resolver::{resolve_permissions, RoleLookupError, RoleSource};
pub use roles::{default_roles, Role, RoleName, Roles};
pub use token::{InvalidToken, TokenCodec, TokenError};
pub use user::{UserAccount, UserChanges, UserProfile};

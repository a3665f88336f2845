use petstore_auth::{Actor, IdentityClaims};
use petstore_core::UserId;

/// Verified caller identity for a request.
///
/// Inserted into request extensions by the authentication middleware only
/// when a token verified; its absence means an anonymous caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    claims: IdentityClaims,
}

impl AuthContext {
    pub fn new(claims: IdentityClaims) -> Self {
        Self { claims }
    }

    pub fn user_id(&self) -> UserId {
        self.claims.id
    }

    pub fn claims(&self) -> &IdentityClaims {
        &self.claims
    }

    pub fn actor(&self) -> Actor {
        self.claims.actor()
    }
}

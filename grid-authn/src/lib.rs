//! Resolves a `GridPrincipal` from pre-validated JWT claims: direct role
//! assignments plus group-mapped roles (via the Group→Role snapshot) are
//! unioned into one effective role-name list, which downstream guards and
//! the policy engine consume.
//!
//! Verification of the token itself (signature, issuer, audience, expiry) is
//! out of scope here — `r2e-security`'s `JwtClaimsValidator` already ran by
//! the time `from_jwt_claims` is called; this module only interprets the
//! claims it hands back.

mod principal;

pub use principal::{GridPrincipal, GroupClaimPath, PrincipalKind};

pub mod prelude {
    pub use crate::{GridPrincipal, GroupClaimPath, PrincipalKind};
}

use crate::backend::BackendError;

use super::principal::Principal;

pub const SIGN_IN_PATH: &str = "/signin";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Borrower,
    Lender,
    Admin,
    CountryAdmin,
    SuperAdmin,
    /// A role string outside the known set. Present, but satisfies no policy.
    Other(String),
}

impl Role {
    /// Exact match against the stored role string; no case folding, no substring matching.
    pub fn parse(s: &str) -> Role {
        match s {
            "borrower" => Role::Borrower,
            "lender" => Role::Lender,
            "admin" => Role::Admin,
            "country_admin" => Role::CountryAdmin,
            "super_admin" => Role::SuperAdmin,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Borrower => "borrower",
            Role::Lender => "lender",
            Role::Admin => "admin",
            Role::CountryAdmin => "country_admin",
            Role::SuperAdmin => "super_admin",
            Role::Other(s) => s.as_str(),
        }
    }

    pub fn is_admin_capable(&self) -> bool {
        matches!(self, Role::Admin | Role::CountryAdmin | Role::SuperAdmin)
    }

    /// Landing page for the role, `None` for unknown roles.
    pub fn dashboard_path(&self) -> Option<&'static str> {
        match self {
            Role::Borrower => Some("/borrower/dashboard"),
            Role::Lender => Some("/lender/dashboard"),
            Role::Admin | Role::CountryAdmin | Role::SuperAdmin => Some("/admin/dashboard"),
            Role::Other(_) => None,
        }
    }
}

/// Where a denial is rendered: pages redirect, API routes answer with a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Page,
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Required {
    /// Any role in the known set.
    AnyKnown,
    OneOf(&'static [Role]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub required: Required,
    pub surface: Surface,
}

impl Policy {
    pub const BORROWER_PAGE: Policy = Policy { required: Required::OneOf(&[Role::Borrower]), surface: Surface::Page };
    pub const LENDER_PAGE: Policy = Policy { required: Required::OneOf(&[Role::Lender]), surface: Surface::Page };
    pub const ADMIN_PAGE: Policy = Policy {
        required: Required::OneOf(&[Role::Admin, Role::CountryAdmin, Role::SuperAdmin]),
        surface: Surface::Page,
    };
    pub const SUPER_ADMIN_PAGE: Policy = Policy { required: Required::OneOf(&[Role::SuperAdmin]), surface: Surface::Page };
    pub const ANY_ROLE_PAGE: Policy = Policy { required: Required::AnyKnown, surface: Surface::Page };

    pub fn admits(&self, role: &Role) -> bool {
        match &self.required {
            Required::AnyKnown => !matches!(role, Role::Other(_)),
            Required::OneOf(roles) => roles.contains(role),
        }
    }

    fn unauthenticated(&self) -> Decision {
        match self.surface {
            Surface::Page => Decision::Redirect(SIGN_IN_PATH.to_string()),
            Surface::Api => Decision::Status(401),
        }
    }

    fn unauthorized(&self) -> Decision {
        match self.surface {
            Surface::Page => Decision::Redirect(HOME_PATH.to_string()),
            Surface::Api => Decision::Status(403),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
    Status(u16),
}

pub type RoleOutcome = Result<Option<Role>, BackendError>;

/// Pure gate decision for one request snapshot.
///
/// No session, a failed role lookup and a missing profile all count as unauthenticated;
/// a present role outside the policy is unauthorized.
pub fn evaluate(policy: &Policy, session: Option<&Principal>, role: &RoleOutcome) -> Decision {
    if session.is_none() {
        return policy.unauthenticated();
    }
    match role {
        Err(_) | Ok(None) => policy.unauthenticated(),
        Ok(Some(r)) if policy.admits(r) => Decision::Allow,
        Ok(Some(_)) => policy.unauthorized(),
    }
}

/// Gate for admin-only API routes, driven by the backend's `is_admin` procedure.
/// A failed check is treated the same as `false`.
pub fn evaluate_admin(session: Option<&Principal>, is_admin: &Result<bool, BackendError>) -> Decision {
    if session.is_none() {
        return Decision::Status(401);
    }
    match is_admin {
        Ok(true) => Decision::Allow,
        Ok(false) | Err(_) => Decision::Status(403),
    }
}

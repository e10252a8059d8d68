//! Request identity and role gating.
//! Keep the public surface thin and split implementation across sub-modules.

mod authorizer;
mod gate;
mod principal;
mod provider;
mod request_context;
mod session;

pub use authorizer::{evaluate, evaluate_admin, Decision, Policy, Required, Role, RoleOutcome, Surface, HOME_PATH, SIGN_IN_PATH};
pub use gate::AccessGate;
pub use principal::Principal;
pub use provider::RoleLookup;
pub use request_context::RequestContext;
pub use session::{Session, SessionResolver, SessionToken};

use serde::{Deserialize, Serialize};

use crate::backend::AuthUser;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<AuthUser> for Principal {
    fn from(u: AuthUser) -> Self {
        Principal { user_id: u.id, email: u.email }
    }
}

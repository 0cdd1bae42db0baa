//! Client-held session state and the landing-route policy.

use serde::{Deserialize, Serialize};

use crate::{Role, UserRecord};

/// Who is logged in, plus the transient credential-operation flag.
///
/// `is_loading` covers bootstrap and in-flight login/profile/password calls
/// only. Page-level loading flags live with the pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<UserRecord>,
    pub is_loading: bool,
}

impl Session {
    /// State before `bootstrap` has read the token store.
    pub fn starting() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }

    pub fn logged_out() -> Self {
        Self {
            user: None,
            is_loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn role(&self) -> Option<&Role> {
        self.user.as_ref().and_then(|u| u.role.as_ref())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::starting()
    }
}

/// Where a freshly authenticated user is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingRoute {
    AdminDashboard,
    TenantDashboard,
    Home,
}

impl LandingRoute {
    /// `admin` → admin dashboard, any other resolved role → tenant dashboard,
    /// no role → home.
    pub fn for_role(role: Option<&Role>) -> Self {
        match role {
            Some(Role::Admin) => LandingRoute::AdminDashboard,
            Some(_) => LandingRoute::TenantDashboard,
            None => LandingRoute::Home,
        }
    }
}

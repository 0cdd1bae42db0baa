use arkedia_auth::LandingRoute;

pub const HOME: &str = "/";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
pub const TENANT_DASHBOARD: &str = "/tenant/dashboard";
/// Where the access guard sends users who may not view a page.
pub const DEFAULT_DASHBOARD: &str = "/dashboard";
pub const CHANGE_PASSWORD: &str = "/change-password";

pub fn landing_path(route: LandingRoute) -> &'static str {
    match route {
        LandingRoute::AdminDashboard => ADMIN_DASHBOARD,
        LandingRoute::TenantDashboard => TENANT_DASHBOARD,
        LandingRoute::Home => HOME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkedia_auth::Role;

    #[test]
    fn role_landing_paths() {
        assert_eq!(landing_path(LandingRoute::for_role(Some(&Role::Admin))), ADMIN_DASHBOARD);
        assert_eq!(landing_path(LandingRoute::for_role(Some(&Role::Employee))), TENANT_DASHBOARD);
        assert_eq!(landing_path(LandingRoute::for_role(Some(&Role::Tenant))), TENANT_DASHBOARD);
        assert_eq!(landing_path(LandingRoute::for_role(None)), HOME);
    }
}

use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Farmer,
    Consumer,
    Verifier,
    Financial,
    Admin,
}

impl RoleName {
    pub const ALL: [RoleName; 5] = [
        RoleName::Farmer,
        RoleName::Consumer,
        RoleName::Verifier,
        RoleName::Financial,
        RoleName::Admin,
    ];

    /// Roles offered on the role selection screen. Admins are provisioned
    /// directly in the backend.
    pub const SELF_REGISTERABLE: [RoleName; 4] = [
        RoleName::Farmer,
        RoleName::Consumer,
        RoleName::Verifier,
        RoleName::Financial,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Farmer => "farmer",
            Self::Consumer => "consumer",
            Self::Verifier => "verifier",
            Self::Financial => "financial",
            Self::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Farmer => "Farmer",
            Self::Consumer => "Consumer",
            Self::Verifier => "Verifier",
            Self::Financial => "Financial Institution",
            Self::Admin => "Administrator",
        }
    }

    pub fn tagline(self) -> &'static str {
        match self {
            Self::Farmer => "List products, get verified, and secure funding",
            Self::Consumer => "Find verified products and support farmers",
            Self::Verifier => "Evaluate farms and issue blockchain certificates",
            Self::Financial => "Access records and approve farm loans",
            Self::Admin => "Approve verifiers and oversee the marketplace",
        }
    }

    pub fn dashboard_route(self) -> Route {
        Route::Dashboard(self)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Marketplace,
    RoleSelect,
    Connect(Option<RoleName>),
    Dashboard(RoleName),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Marketplace => "/marketplace".to_string(),
            Self::RoleSelect => "/role".to_string(),
            Self::Connect(_) => "/auth".to_string(),
            Self::Dashboard(role) => format!("/{}/dashboard", role.as_str()),
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        match trimmed {
            "" => return Some(Self::Home),
            "/marketplace" => return Some(Self::Marketplace),
            "/role" => return Some(Self::RoleSelect),
            "/auth" => return Some(Self::Connect(None)),
            _ => {}
        }

        let rest = trimmed.strip_prefix('/')?;
        let (role, tail) = rest.split_once('/')?;
        if tail != "dashboard" {
            return None;
        }
        RoleName::parse(role).map(Self::Dashboard)
    }
}

/// Resolves the route that is actually reachable for `session`.
pub fn guard(route: Route, session: &Session) -> Route {
    let Route::Dashboard(wanted) = route else {
        return route;
    };

    match session.role {
        None => Route::RoleSelect,
        Some(role) if role == wanted => route,
        Some(role) => role.dashboard_route(),
    }
}

#[cfg(test)]
mod tests {
    use super::{guard, RoleName, Route};
    use crate::session::Session;

    fn session_with(role: Option<RoleName>) -> Session {
        Session {
            address: role.map(|_| "0xaa".to_string()),
            role,
            ..Session::default()
        }
    }

    #[test]
    fn dashboard_paths_round_trip_for_every_role() {
        for role in RoleName::ALL {
            let path = role.dashboard_route().path();
            assert_eq!(Route::from_path(&path), Some(Route::Dashboard(role)));
        }
    }

    #[test]
    fn from_path_handles_static_routes_and_rejects_unknown() {
        assert_eq!(Route::from_path("/"), Some(Route::Home));
        assert_eq!(Route::from_path("/marketplace/"), Some(Route::Marketplace));
        assert_eq!(Route::from_path("/auth"), Some(Route::Connect(None)));
        assert_eq!(Route::from_path("/farmer/settings"), None);
        assert_eq!(Route::from_path("/miller/dashboard"), None);
    }

    #[test]
    fn guard_redirects_to_role_selection_without_role() {
        let session = session_with(None);
        assert_eq!(
            guard(Route::Dashboard(RoleName::Farmer), &session),
            Route::RoleSelect
        );
        assert_eq!(guard(Route::Marketplace, &session), Route::Marketplace);
    }

    #[test]
    fn guard_sends_other_roles_to_their_own_dashboard() {
        let session = session_with(Some(RoleName::Consumer));
        assert_eq!(
            guard(Route::Dashboard(RoleName::Admin), &session),
            Route::Dashboard(RoleName::Consumer)
        );
        assert_eq!(
            guard(Route::Dashboard(RoleName::Consumer), &session),
            Route::Dashboard(RoleName::Consumer)
        );
    }

    #[test]
    fn admin_is_not_self_registerable() {
        assert!(!RoleName::SELF_REGISTERABLE.contains(&RoleName::Admin));
        assert_eq!(RoleName::parse(" Verifier "), Some(RoleName::Verifier));
    }
}

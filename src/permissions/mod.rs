//! Role resolution and the static role → capability table.
//!
//! Every privileged surface asks a [`PermissionResolver`] before showing or
//! running an admin action. Resolution never fails: an unknown or missing
//! role simply grants nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles an identity can hold, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Staff,
    Editor,
    Teacher,
    Member,
    Viewer,
}

/// Stored values from older deployments and the role they now mean
const LEGACY_ROLE_ALIASES: &[(&str, Role)] = &[("admin", Role::Administrator)];

impl Role {
    /// Precedence used when an identity has several role rows
    pub const PRIORITY: [Role; 6] = [
        Role::Administrator,
        Role::Staff,
        Role::Editor,
        Role::Teacher,
        Role::Member,
        Role::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Staff => "staff",
            Role::Editor => "editor",
            Role::Teacher => "teacher",
            Role::Member => "member",
            Role::Viewer => "viewer",
        }
    }

    /// Interpret a stored role value, applying legacy aliases.
    /// Returns `None` for anything unrecognized.
    pub fn from_stored(value: &str) -> Option<Role> {
        let value = value.trim().to_ascii_lowercase();
        if let Some(role) = Self::PRIORITY.iter().find(|role| role.as_str() == value) {
            return Some(*role);
        }
        LEGACY_ROLE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == value)
            .map(|(_, role)| *role)
    }

    /// Every stored value that resolves to this role
    pub fn stored_names(&self) -> Vec<&'static str> {
        let mut names = vec![self.as_str()];
        names.extend(
            LEGACY_ROLE_ALIASES
                .iter()
                .filter(|(_, role)| role == self)
                .map(|(alias, _)| *alias),
        );
        names
    }

    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;

        match self {
            Role::Administrator => Capability::ALL,
            Role::Staff => &[
                ViewDashboard,
                ViewMembers,
                ManageMembers,
                ManageEvents,
                ManageDepartments,
                ManageAttendance,
                ManageSchool,
                ManagePrayerRequests,
                SendMessages,
                ViewReports,
                ExportData,
            ],
            Role::Editor => &[
                ViewDashboard,
                ViewMembers,
                ManageEvents,
                ManageDepartments,
                ManagePrayerRequests,
            ],
            Role::Teacher => &[ViewDashboard, ViewMembers, ManageAttendance, ManageSchool],
            Role::Member => &[ViewDashboard],
            Role::Viewer => &[],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::from_stored(s).ok_or_else(|| format!("unknown role: {}", s))
    }
}

/// Named admin actions gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewDashboard,
    ViewMembers,
    ManageMembers,
    ManageEvents,
    ManageDepartments,
    ManageAttendance,
    ManageSchool,
    ManagePrayerRequests,
    SendMessages,
    ViewReports,
    ExportData,
    ManageRoles,
    SyncDirectory,
}

impl Capability {
    pub const ALL: &'static [Capability] = &[
        Capability::ViewDashboard,
        Capability::ViewMembers,
        Capability::ManageMembers,
        Capability::ManageEvents,
        Capability::ManageDepartments,
        Capability::ManageAttendance,
        Capability::ManageSchool,
        Capability::ManagePrayerRequests,
        Capability::SendMessages,
        Capability::ViewReports,
        Capability::ExportData,
        Capability::ManageRoles,
        Capability::SyncDirectory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewDashboard => "view_dashboard",
            Capability::ViewMembers => "view_members",
            Capability::ManageMembers => "manage_members",
            Capability::ManageEvents => "manage_events",
            Capability::ManageDepartments => "manage_departments",
            Capability::ManageAttendance => "manage_attendance",
            Capability::ManageSchool => "manage_school",
            Capability::ManagePrayerRequests => "manage_prayer_requests",
            Capability::SendMessages => "send_messages",
            Capability::ViewReports => "view_reports",
            Capability::ExportData => "export_data",
            Capability::ManageRoles => "manage_roles",
            Capability::SyncDirectory => "sync_directory",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .find(|capability| capability.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown capability: {}", s))
    }
}

/// Pick the highest-priority recognized role among an identity's stored rows.
///
/// Row order does not matter and unrecognized values are skipped.
pub fn resolve_role<S: AsRef<str>>(rows: &[S]) -> Option<Role> {
    let held: Vec<Role> = rows
        .iter()
        .filter_map(|row| Role::from_stored(row.as_ref()))
        .collect();

    Role::PRIORITY.into_iter().find(|role| held.contains(role))
}

/// Answers capability questions for one resolved role (or none)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionResolver {
    role: Option<Role>,
}

impl PermissionResolver {
    pub fn new(role: Option<Role>) -> Self {
        Self { role }
    }

    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        Self::new(resolve_role(rows))
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role
            .map(|role| role.capabilities().contains(&capability))
            .unwrap_or(false)
    }

    pub fn can_any(&self, capabilities: &[Capability]) -> bool {
        capabilities.iter().any(|capability| self.can(*capability))
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        self.role
            .map(|role| role.capabilities().to_vec())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrator_outranks_member_in_any_order() {
        assert_eq!(resolve_role(&["member", "administrator"]), Some(Role::Administrator));
        assert_eq!(resolve_role(&["administrator", "member"]), Some(Role::Administrator));
    }

    #[test]
    fn precedence_follows_priority_list() {
        assert_eq!(resolve_role(&["viewer", "teacher", "editor"]), Some(Role::Editor));
        assert_eq!(resolve_role(&["member", "staff"]), Some(Role::Staff));
        assert_eq!(resolve_role(&["viewer"]), Some(Role::Viewer));
    }

    #[test]
    fn legacy_admin_maps_to_administrator() {
        assert_eq!(Role::from_stored("admin"), Some(Role::Administrator));
        assert_eq!(Role::from_stored(" ADMIN "), Some(Role::Administrator));
        assert_eq!(resolve_role(&["staff", "admin"]), Some(Role::Administrator));
    }

    #[test]
    fn stored_names_include_aliases() {
        assert_eq!(Role::Administrator.stored_names(), vec!["administrator", "admin"]);
        assert_eq!(Role::Staff.stored_names(), vec!["staff"]);
    }

    #[test]
    fn no_rows_resolves_to_no_role() {
        let rows: [&str; 0] = [];
        assert_eq!(resolve_role(&rows), None);
        assert_eq!(resolve_role(&["pastor", "superuser"]), None);
    }

    #[test]
    fn unknown_role_grants_nothing() {
        let resolver = PermissionResolver::from_rows(&["bishop"]);
        assert_eq!(resolver.role(), None);
        for capability in Capability::ALL {
            assert!(!resolver.can(*capability));
        }
        assert!(resolver.capabilities().is_empty());
    }

    #[test]
    fn missing_role_fails_can_any() {
        let resolver = PermissionResolver::new(None);
        assert!(!resolver.can_any(&[Capability::ViewDashboard, Capability::SyncDirectory]));
        assert!(!resolver.can_any(Capability::ALL));
    }

    #[test]
    fn can_any_on_empty_list_is_false() {
        let resolver = PermissionResolver::new(Some(Role::Administrator));
        assert!(!resolver.can_any(&[]));
    }

    #[test]
    fn administrator_has_every_capability() {
        let resolver = PermissionResolver::new(Some(Role::Administrator));
        for capability in Capability::ALL {
            assert!(resolver.can(*capability), "missing {}", capability);
        }
    }

    #[test]
    fn only_administrator_syncs_or_manages_roles() {
        for role in Role::PRIORITY.into_iter().skip(1) {
            let resolver = PermissionResolver::new(Some(role));
            assert!(!resolver.can(Capability::SyncDirectory), "{} can sync", role);
            assert!(!resolver.can(Capability::ManageRoles), "{} can manage roles", role);
        }
    }

    #[test]
    fn teacher_sees_school_but_not_messaging() {
        let resolver = PermissionResolver::new(Some(Role::Teacher));
        assert!(resolver.can(Capability::ManageAttendance));
        assert!(!resolver.can(Capability::SendMessages));
        assert!(resolver.can_any(&[Capability::SendMessages, Capability::ManageSchool]));
    }

    #[test]
    fn viewer_grants_nothing() {
        assert!(PermissionResolver::new(Some(Role::Viewer)).capabilities().is_empty());
    }

    #[test]
    fn capability_names_round_trip() {
        for capability in Capability::ALL {
            assert_eq!(capability.as_str().parse::<Capability>(), Ok(*capability));
        }
        assert!("fly".parse::<Capability>().is_err());
    }
}

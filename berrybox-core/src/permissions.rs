use std::fmt::Display;
use std::str::FromStr;

use crate::BoxOptions;

/// The role of a subscriber in a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Moderator,
    Vip,
    Simple,
}

/// An action that can be granted to a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    AddVideo,
    RemoveVideo,
    ForceNext,
    ForcePlay,
    SkipVideo,
    EditBox,
    SetVip,
    UnsetVip,
    InviteUser,
    BypassVideoDurationLimit,
}

/// The outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Denied,
    Allowed,
    /// Not granted by the role, but can be bought with berries.
    /// The caller is responsible for checking and deducting the balance.
    AllowedViaBerries,
}

/// Which actions each role is allowed to perform in a box. Admins can do everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub moderator: Vec<Permission>,
    pub vip: Vec<Permission>,
    pub simple: Vec<Permission>,
}

impl Permission {
    pub const ALL: [Permission; 10] = [
        Permission::AddVideo,
        Permission::RemoveVideo,
        Permission::ForceNext,
        Permission::ForcePlay,
        Permission::SkipVideo,
        Permission::EditBox,
        Permission::SetVip,
        Permission::UnsetVip,
        Permission::InviteUser,
        Permission::BypassVideoDurationLimit,
    ];

    /// The camelCase name used by clients
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AddVideo => "addVideo",
            Permission::RemoveVideo => "removeVideo",
            Permission::ForceNext => "forceNext",
            Permission::ForcePlay => "forcePlay",
            Permission::SkipVideo => "skipVideo",
            Permission::EditBox => "editBox",
            Permission::SetVip => "setVIP",
            Permission::UnsetVip => "unsetVIP",
            Permission::InviteUser => "inviteUser",
            Permission::BypassVideoDurationLimit => "bypassVideoDurationLimit",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown permission {}", s))
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Vip => "vip",
            Role::Simple => "simple",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Acl {
    /// Returns the permissions granted to a role
    pub fn permissions(&self, role: Role) -> &[Permission] {
        match role {
            Role::Admin => &Permission::ALL,
            Role::Moderator => &self.moderator,
            Role::Vip => &self.vip,
            Role::Simple => &self.simple,
        }
    }

    pub fn allows(&self, role: Role, permission: Permission) -> bool {
        self.permissions(role).contains(&permission)
    }

    /// Replaces the permissions of a role. Admin permissions cannot be changed.
    pub fn set(&mut self, role: Role, permissions: Vec<Permission>) {
        match role {
            Role::Admin => {}
            Role::Moderator => self.moderator = permissions,
            Role::Vip => self.vip = permissions,
            Role::Simple => self.simple = permissions,
        }
    }
}

impl Default for Acl {
    fn default() -> Self {
        use Permission::*;

        Self {
            moderator: vec![
                AddVideo,
                RemoveVideo,
                ForceNext,
                ForcePlay,
                SkipVideo,
                EditBox,
                SetVip,
                UnsetVip,
                InviteUser,
                BypassVideoDurationLimit,
            ],
            vip: vec![AddVideo, RemoveVideo, ForceNext, SkipVideo, InviteUser],
            simple: vec![AddVideo],
        }
    }
}

/// Resolves whether a role may perform an action in a box.
pub fn authorize(
    role: Role,
    acl: &Acl,
    options: &BoxOptions,
    permission: Permission,
    berries_overridable: &[Permission],
) -> Authorization {
    if role == Role::Admin || acl.allows(role, permission) {
        return Authorization::Allowed;
    }

    if options.berries && berries_overridable.contains(&permission) {
        return Authorization::AllowedViaBerries;
    }

    Authorization::Denied
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Config;

    fn options(berries: bool) -> BoxOptions {
        BoxOptions {
            berries,
            ..Default::default()
        }
    }

    #[test]
    fn test_admin_bypasses_acl() {
        let acl = Acl {
            moderator: vec![],
            vip: vec![],
            simple: vec![],
        };

        for permission in Permission::ALL {
            assert_eq!(
                authorize(Role::Admin, &acl, &options(false), permission, &[]),
                Authorization::Allowed
            );
        }
    }

    #[test]
    fn test_berries_override() {
        let acl = Acl::default();
        let overridable = Config::default().berries_overridable;

        assert_eq!(
            authorize(
                Role::Simple,
                &acl,
                &options(true),
                Permission::SkipVideo,
                &overridable
            ),
            Authorization::AllowedViaBerries
        );
        assert_eq!(
            authorize(
                Role::Simple,
                &acl,
                &options(false),
                Permission::SkipVideo,
                &overridable
            ),
            Authorization::Denied
        );
        assert_eq!(
            authorize(
                Role::Vip,
                &acl,
                &options(true),
                Permission::SkipVideo,
                &overridable
            ),
            Authorization::Allowed
        );
        // Editing a box can never be bought
        assert_eq!(
            authorize(
                Role::Simple,
                &acl,
                &options(true),
                Permission::EditBox,
                &overridable
            ),
            Authorization::Denied
        );
    }

    #[test]
    fn test_acl_changes() {
        let mut acl = Acl::default();
        acl.set(Role::Simple, vec![Permission::AddVideo, Permission::SkipVideo]);
        acl.set(Role::Admin, vec![]);

        assert!(acl.allows(Role::Simple, Permission::SkipVideo));
        assert!(acl.allows(Role::Admin, Permission::EditBox));
    }

    #[test]
    fn test_permission_names() {
        for permission in Permission::ALL {
            assert_eq!(permission.as_str().parse::<Permission>(), Ok(permission));
        }

        assert!("flyAway".parse::<Permission>().is_err());
    }
}

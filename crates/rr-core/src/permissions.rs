//! # Permission Evaluator
//!
//! Authorization runs in two stages. The collection stage sees only the
//! method and the actor and runs before any object is loaded; the object stage
//! runs after the target is fetched and can consult its author. A [`Policy`]
//! grants a request when any of its [`Permission`]s does.

use crate::error::{AppError, Result};
use crate::models::{Role, User, UserId};

/// Request method, reduced to what the permission checks need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Read-type methods that never mutate state.
    pub fn is_safe(self) -> bool {
        matches!(self, Method::Get | Method::Head | Method::Options)
    }
}

/// What an actor may do, each tied to the lowest role on the ladder that has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Edit or delete anyone's reviews and comments
    Moderate,
    /// Manage taxonomy, titles and accounts
    Administer,
}

impl Capability {
    pub fn minimum_role(self) -> Role {
        match self {
            Capability::Moderate => Role::Moderator,
            Capability::Administer => Role::Admin,
        }
    }
}

impl User {
    /// The superuser flag lifts any account to the top of the ladder.
    pub fn effective_role(&self) -> Role {
        if self.is_superuser {
            Role::Admin
        } else {
            self.role
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.effective_role() >= capability.minimum_role()
    }

    pub fn is_admin(&self) -> bool {
        self.has_capability(Capability::Administer)
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

/// A single grant. See [`Policy`] for how grants combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Safe methods only, for anyone.
    ReadOnly,
    /// Any method for any authenticated actor.
    Authenticated,
    /// Any method, but only for authenticated actors holding the capability.
    /// Anonymous and under-privileged actors are denied at the collection stage.
    RoleAtLeast(Capability),
    /// The collection stage admits safe methods and every authenticated actor;
    /// the object stage requires the capability for mutations.
    RoleAtLeastOrReadOnly(Capability),
    /// The collection stage admits safe methods and every authenticated actor;
    /// the object stage requires the actor to be the object's author for mutations.
    OwnerOrReadOnly,
}

impl Permission {
    pub fn has_permission(&self, method: Method, actor: Option<&User>) -> bool {
        match self {
            Permission::ReadOnly => method.is_safe(),
            Permission::Authenticated => actor.is_some(),
            Permission::RoleAtLeast(capability) => actor.is_some_and(|u| u.has_capability(*capability)),
            Permission::RoleAtLeastOrReadOnly(_) | Permission::OwnerOrReadOnly => {
                method.is_safe() || actor.is_some()
            }
        }
    }

    /// `owner` is the author of the object, when the object has one.
    pub fn has_object_permission(&self, method: Method, actor: Option<&User>, owner: Option<UserId>) -> bool {
        match self {
            Permission::ReadOnly => method.is_safe(),
            Permission::Authenticated => actor.is_some(),
            Permission::RoleAtLeast(capability) => actor.is_some_and(|u| u.has_capability(*capability)),
            Permission::RoleAtLeastOrReadOnly(capability) => {
                method.is_safe() || actor.is_some_and(|u| u.has_capability(*capability))
            }
            Permission::OwnerOrReadOnly => {
                method.is_safe() || matches!((actor, owner), (Some(u), Some(author)) if u.id == author)
            }
        }
    }
}

/// Grants combined with logical OR.
#[derive(Debug, Clone, Copy)]
pub struct Policy(&'static [Permission]);

/// Categories, genres and titles: `IsAdmin | ReadOnly`.
pub const CATALOG_POLICY: Policy = Policy::any_of(&[
    Permission::RoleAtLeast(Capability::Administer),
    Permission::ReadOnly,
]);

/// Reviews and comments: `IsAdminOrModerator | IsOwnerOrReadOnly`.
pub const CONTRIBUTION_POLICY: Policy = Policy::any_of(&[
    Permission::RoleAtLeastOrReadOnly(Capability::Moderate),
    Permission::OwnerOrReadOnly,
]);

/// The account administration resource.
pub const ACCOUNTS_POLICY: Policy = Policy::any_of(&[Permission::RoleAtLeast(Capability::Administer)]);

/// The caller's own profile.
pub const SELF_POLICY: Policy = Policy::any_of(&[Permission::Authenticated]);

impl Policy {
    pub const fn any_of(grants: &'static [Permission]) -> Self {
        Policy(grants)
    }

    pub fn allows(&self, method: Method, actor: Option<&User>) -> bool {
        self.0.iter().any(|p| p.has_permission(method, actor))
    }

    /// A grant only counts at the object stage if it also passed the
    /// collection stage, so a grant cannot open an object it never admitted.
    pub fn allows_object(&self, method: Method, actor: Option<&User>, owner: Option<UserId>) -> bool {
        self.0
            .iter()
            .any(|p| p.has_permission(method, actor) && p.has_object_permission(method, actor, owner))
    }

    /// Collection-stage gate.
    pub fn check(&self, method: Method, actor: Option<&User>) -> Result<()> {
        if self.allows(method, actor) {
            Ok(())
        } else {
            Err(denied(actor))
        }
    }

    /// Object-stage gate.
    pub fn check_object(&self, method: Method, actor: Option<&User>, owner: Option<UserId>) -> Result<()> {
        if self.allows_object(method, actor, owner) {
            Ok(())
        } else {
            Err(denied(actor))
        }
    }
}

fn denied(actor: Option<&User>) -> AppError {
    match actor {
        None => AppError::Unauthorized("authentication credentials were not provided".into()),
        Some(_) => AppError::Forbidden("you do not have permission to perform this action".into()),
    }
}

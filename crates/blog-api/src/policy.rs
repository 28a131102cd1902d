//! Single authorization decision point for every protected operation.
//!
//! Rules:
//! * any authenticated user may read and create cards, upload and list media;
//! * only a card's author may update it, delete it, or attach media to it
//!   (admins get no override on content);
//! * only admins may read the user directory or change roles.

use blog_types::models::Role;

use crate::error::ApiError;
use crate::middleware::CurrentUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    AttachMedia,
    ChangeRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The card collection, for listing and creating.
    Cards,
    Card { author_id: i64 },
    Media,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn require(self) -> Result<(), ApiError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(ApiError::Forbidden(reason)),
        }
    }
}

pub fn authorize(caller: &CurrentUser, action: Action, resource: Resource) -> Decision {
    use Action::*;

    match (resource, action) {
        (Resource::Cards, Read | Create) | (Resource::Card { .. }, Read) => Decision::Allow,
        (Resource::Media, Read | Create) => Decision::Allow,

        (Resource::Card { author_id }, Update | Delete | AttachMedia) => {
            if caller.id == author_id {
                Decision::Allow
            } else {
                Decision::Deny("not the author of this card")
            }
        }

        (Resource::Users, Read | ChangeRole) => {
            if caller.role == Role::Admin {
                Decision::Allow
            } else {
                Decision::Deny("admin role required")
            }
        }

        _ => Decision::Deny("operation not permitted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: Role) -> CurrentUser {
        CurrentUser {
            id,
            username: format!("user{id}"),
            role,
        }
    }

    #[test]
    fn only_author_mutates_card() {
        let card = Resource::Card { author_id: 1 };
        for action in [Action::Update, Action::Delete, Action::AttachMedia] {
            assert!(authorize(&user(1, Role::Viewer), action, card).is_allowed());
            assert!(!authorize(&user(2, Role::Developer), action, card).is_allowed());
            assert!(!authorize(&user(3, Role::Admin), action, card).is_allowed());
        }
    }

    #[test]
    fn any_user_reads_and_creates() {
        for role in Role::ALL {
            let caller = user(9, role);
            assert!(authorize(&caller, Action::Read, Resource::Cards).is_allowed());
            assert!(authorize(&caller, Action::Create, Resource::Cards).is_allowed());
            assert!(authorize(&caller, Action::Read, Resource::Card { author_id: 1 }).is_allowed());
            assert!(authorize(&caller, Action::Create, Resource::Media).is_allowed());
            assert!(authorize(&caller, Action::Read, Resource::Media).is_allowed());
        }
    }

    #[test]
    fn role_changes_need_admin() {
        assert!(authorize(&user(1, Role::Admin), Action::ChangeRole, Resource::Users).is_allowed());
        assert!(authorize(&user(1, Role::Admin), Action::Read, Resource::Users).is_allowed());
        for role in [Role::Developer, Role::Viewer] {
            let decision = authorize(&user(1, role), Action::ChangeRole, Resource::Users);
            assert_eq!(decision, Decision::Deny("admin role required"));
            assert!(matches!(decision.require(), Err(ApiError::Forbidden(_))));
        }
    }

    #[test]
    fn unlisted_combinations_are_denied() {
        let admin = user(1, Role::Admin);
        assert!(!authorize(&admin, Action::Delete, Resource::Users).is_allowed());
        assert!(!authorize(&admin, Action::ChangeRole, Resource::Cards).is_allowed());
        assert!(!authorize(&admin, Action::Delete, Resource::Media).is_allowed());
    }
}

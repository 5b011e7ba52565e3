//! Who counts as "involved" in an exchange.
//!
//! Exchange actions, hiding, reviews and the companion chat-message checks
//! all ask this module; none of them compare owner/requester ids directly.

use serde::{Deserialize, Serialize};

use crate::entities::{Exchange, UserId};

/// Side of an exchange a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Owner of the item
    Owner,
    /// User who asked for the item
    Requester,
}

impl Role {
    /// The other side
    pub fn other(self) -> Role {
        match self {
            Role::Owner => Role::Requester,
            Role::Requester => Role::Owner,
        }
    }
}

/// `true` iff `user_id` is the exchange's owner or requester.
pub fn is_participant(exchange: &Exchange, user_id: UserId) -> bool {
    exchange.owner_id == user_id || exchange.requester_id == user_id
}

/// Resolve the participant's role, `None` for outsiders.
///
/// Owner wins if both ids are equal; request creation rejects that case.
pub fn role_of(exchange: &Exchange, user_id: UserId) -> Option<Role> {
    if exchange.owner_id == user_id {
        Some(Role::Owner)
    } else if exchange.requester_id == user_id {
        Some(Role::Requester)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Item;
    use uuid::Uuid;

    #[test]
    fn test_participant_predicate() {
        let owner = Uuid::now_v7();
        let requester = Uuid::now_v7();
        let outsider = Uuid::now_v7();
        let item = Item::new(owner, "Lamp", "home").unwrap();
        let exchange = Exchange::request(&item, requester, None);

        assert!(is_participant(&exchange, owner));
        assert!(is_participant(&exchange, requester));
        assert!(!is_participant(&exchange, outsider));
    }

    #[test]
    fn test_role_resolution_agrees_with_predicate() {
        let owner = Uuid::now_v7();
        let requester = Uuid::now_v7();
        let item = Item::new(owner, "Lamp", "home").unwrap();
        let exchange = Exchange::request(&item, requester, None);

        assert_eq!(role_of(&exchange, owner), Some(Role::Owner));
        assert_eq!(role_of(&exchange, requester), Some(Role::Requester));

        for user in [owner, requester, Uuid::now_v7()] {
            assert_eq!(role_of(&exchange, user).is_some(), is_participant(&exchange, user));
        }
    }

    #[test]
    fn test_role_other() {
        assert_eq!(Role::Owner.other(), Role::Requester);
        assert_eq!(Role::Requester.other(), Role::Owner);
    }
}

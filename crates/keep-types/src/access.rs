use uuid::Uuid;

use crate::models::{Note, Principal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        *self == Access::Allowed
    }
}

/// Ownership check for a single note. Role plays no part: admins only
/// see their own notes too. Callers must report a denial as "not found".
pub fn authorize(principal: &Principal, note: &Note) -> Access {
    authorize_owner(principal, note.owner_id)
}

pub fn authorize_owner(principal: &Principal, owner_id: Uuid) -> Access {
    if principal.id == owner_id {
        Access::Allowed
    } else {
        Access::Denied
    }
}

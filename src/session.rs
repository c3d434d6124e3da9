//! Session and capability model.
//!
//! Permission is an explicit capability check injected into every gateway
//! call, not a status-code sniff after the fact. The backend still answers
//! 403 on its side; this model lets the client short-circuit calls it
//! already knows are not allowed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which portal the session was opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    Admin,
    Franchisor,
    School,
}

impl Portal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Portal::Admin => "admin",
            Portal::Franchisor => "franchisor",
            Portal::School => "school",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ManageFranchisors,
    ManageSchools,
    ManageUsers,
    ManagePlans,
    ManageSubscriptions,
    ManageTickets,
    ManageTemplates,
    ViewAuditLog,
    RequestExports,
}

/// The authenticated context every gateway call runs under.
///
/// Produced by the (out-of-scope) authentication provider; this crate only
/// reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub portal: Portal,
    pub franchisor_id: Option<Uuid>,
    pub school_id: Option<Uuid>,
}

impl Session {
    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            portal: Portal::Admin,
            franchisor_id: None,
            school_id: None,
        }
    }

    pub fn franchisor(user_id: Uuid, franchisor_id: Uuid) -> Self {
        Self {
            user_id,
            portal: Portal::Franchisor,
            franchisor_id: Some(franchisor_id),
            school_id: None,
        }
    }

    pub fn school(user_id: Uuid, franchisor_id: Uuid, school_id: Uuid) -> Self {
        Self {
            user_id,
            portal: Portal::School,
            franchisor_id: Some(franchisor_id),
            school_id: Some(school_id),
        }
    }

    /// Capability matrix per portal. The admin portal sees everything;
    /// franchisor and school portals get the subset their screens expose.
    pub fn allows(&self, capability: Capability) -> bool {
        use Capability::*;
        match self.portal {
            Portal::Admin => true,
            Portal::Franchisor => matches!(
                capability,
                ManageSchools
                    | ManageUsers
                    | ManageSubscriptions
                    | ManageTickets
                    | ManageTemplates
                    | ViewAuditLog
                    | RequestExports
            ),
            Portal::School => matches!(capability, ManageUsers | ManageTickets),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_unrestricted() {
        let session = Session::admin(Uuid::new_v4());
        assert!(session.allows(Capability::ManageFranchisors));
        assert!(session.allows(Capability::ViewAuditLog));
    }

    #[test]
    fn school_portal_cannot_reach_franchisor_screens() {
        let session = Session::school(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert!(!session.allows(Capability::ManageFranchisors));
        assert!(!session.allows(Capability::ManagePlans));
        assert!(!session.allows(Capability::RequestExports));
        assert!(session.allows(Capability::ManageTickets));
    }

    #[test]
    fn franchisor_portal_manages_its_network_but_not_plans() {
        let session = Session::franchisor(Uuid::new_v4(), Uuid::new_v4());
        assert!(session.allows(Capability::ManageSchools));
        assert!(session.allows(Capability::RequestExports));
        assert!(!session.allows(Capability::ManagePlans));
        assert!(!session.allows(Capability::ManageFranchisors));
    }
}

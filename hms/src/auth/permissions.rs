//! Role-based authorization.
//!
//! Authorization is plain set membership: a caller is allowed iff their role is in the allowed
//! set. There is no implicit hierarchy expansion. Callers that want hierarchy semantics build
//! the expanded set with [`expand_allowed`] and pass it explicitly.

use std::collections::BTreeSet;

use crate::{api::models::accounts::Role, errors::Error};

/// Administrative operations
pub const ADMIN_OR_ABOVE: &[Role] = &[Role::SuperAdmin, Role::Admin];

/// Clinical operations
pub const MEDICAL_STAFF: &[Role] = &[Role::Doctor, Role::Nurse, Role::LabTechnician, Role::Pharmacist];

impl Role {
    /// Roles this role may act as or over. Every role contains itself.
    pub fn hierarchy(self) -> &'static [Role] {
        match self {
            Role::SuperAdmin => &Role::ALL,
            Role::Admin => &[
                Role::Admin,
                Role::Doctor,
                Role::Nurse,
                Role::LabTechnician,
                Role::Pharmacist,
                Role::Receptionist,
                Role::Accountant,
            ],
            Role::Doctor => &[Role::Doctor],
            Role::Nurse => &[Role::Nurse],
            Role::LabTechnician => &[Role::LabTechnician],
            Role::Pharmacist => &[Role::Pharmacist],
            Role::Receptionist => &[Role::Receptionist],
            Role::Accountant => &[Role::Accountant],
            Role::Patient => &[Role::Patient],
        }
    }

    /// Whether an account holding this role may administer an account holding `other`.
    pub fn can_manage(self, other: Role) -> bool {
        self.hierarchy().contains(&other)
    }
}

/// Allow the caller iff their role is one of `allowed`.
pub fn authorize(caller: Option<Role>, allowed: &[Role]) -> Result<(), Error> {
    let role = caller.ok_or(Error::Unauthenticated { message: None })?;

    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(Error::Forbidden { role })
    }
}

/// Allow the caller iff `required`, taken as a set, is exactly `{caller}`.
///
/// An account holds one role, so requiring all of several distinct roles never passes.
pub fn authorize_all(caller: Option<Role>, required: &[Role]) -> Result<(), Error> {
    let role = caller.ok_or(Error::Unauthenticated { message: None })?;

    if !required.is_empty() && required.iter().all(|r| *r == role) {
        Ok(())
    } else {
        Err(Error::Forbidden { role })
    }
}

/// Every role whose hierarchy reaches at least one of `required`.
pub fn expand_allowed(required: &[Role]) -> BTreeSet<Role> {
    Role::ALL
        .into_iter()
        .filter(|candidate| required.iter().any(|r| candidate.can_manage(*r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subset(mask: u16) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, r)| r)
            .collect()
    }

    #[test]
    fn test_authorize_is_set_membership() {
        for caller in Role::ALL {
            for mask in 1u16..(1 << Role::ALL.len()) {
                let allowed = subset(mask);
                let result = authorize(Some(caller), &allowed);
                if allowed.contains(&caller) {
                    assert!(result.is_ok(), "{caller} in {allowed:?}");
                } else {
                    assert!(
                        matches!(result, Err(Error::Forbidden { role }) if role == caller),
                        "{caller} not in {allowed:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_missing_caller_is_unauthenticated() {
        assert!(matches!(authorize(None, ADMIN_OR_ABOVE), Err(Error::Unauthenticated { .. })));
        assert!(matches!(authorize(None, &Role::ALL), Err(Error::Unauthenticated { .. })));
        assert!(matches!(authorize_all(None, &[]), Err(Error::Unauthenticated { .. })));
    }

    #[test]
    fn test_empty_allowed_set_forbids_everyone() {
        for role in Role::ALL {
            assert!(matches!(authorize(Some(role), &[]), Err(Error::Forbidden { .. })));
        }
    }

    #[test]
    fn test_no_implicit_hierarchy() {
        // SuperAdmin is above Doctor but is not in the allowed set
        assert!(authorize(Some(Role::SuperAdmin), &[Role::Doctor]).is_err());
        assert!(authorize(Some(Role::SuperAdmin), &expand_allowed(&[Role::Doctor]).into_iter().collect::<Vec<_>>()).is_ok());
    }

    #[test]
    fn test_policies() {
        assert!(authorize(Some(Role::Admin), ADMIN_OR_ABOVE).is_ok());
        assert!(authorize(Some(Role::SuperAdmin), ADMIN_OR_ABOVE).is_ok());
        assert!(authorize(Some(Role::Doctor), ADMIN_OR_ABOVE).is_err());

        for role in [Role::Doctor, Role::Nurse, Role::LabTechnician, Role::Pharmacist] {
            assert!(authorize(Some(role), MEDICAL_STAFF).is_ok());
        }
        for role in [Role::Receptionist, Role::Accountant, Role::Patient, Role::Admin, Role::SuperAdmin] {
            assert!(authorize(Some(role), MEDICAL_STAFF).is_err());
        }
    }

    #[test]
    fn test_authorize_all() {
        assert!(authorize_all(Some(Role::Nurse), &[]).is_err());
        assert!(authorize_all(Some(Role::Nurse), &[Role::Nurse]).is_ok());
        assert!(authorize_all(Some(Role::Nurse), &[Role::Nurse, Role::Nurse]).is_ok());
        assert!(matches!(
            authorize_all(Some(Role::Nurse), &[Role::Nurse, Role::Doctor]),
            Err(Error::Forbidden { role: Role::Nurse })
        ));
        assert!(authorize_all(Some(Role::SuperAdmin), &[Role::Admin]).is_err());
    }

    #[test]
    fn test_hierarchy_table() {
        assert_eq!(Role::SuperAdmin.hierarchy(), &Role::ALL);

        let admin: BTreeSet<Role> = Role::Admin.hierarchy().iter().copied().collect();
        assert_eq!(admin.len(), 7);
        assert!(!admin.contains(&Role::SuperAdmin));
        assert!(!admin.contains(&Role::Patient));

        for role in Role::ALL {
            assert!(role.can_manage(role), "{role} manages itself");
            if !matches!(role, Role::SuperAdmin | Role::Admin) {
                assert_eq!(role.hierarchy(), &[role]);
            }
        }
    }

    #[test]
    fn test_can_manage() {
        assert!(Role::SuperAdmin.can_manage(Role::Admin));
        assert!(Role::SuperAdmin.can_manage(Role::Patient));
        assert!(Role::Admin.can_manage(Role::Doctor));
        assert!(!Role::Admin.can_manage(Role::SuperAdmin));
        assert!(!Role::Admin.can_manage(Role::Patient));
        assert!(!Role::Doctor.can_manage(Role::Nurse));
    }

    #[test]
    fn test_expand_allowed() {
        assert_eq!(
            expand_allowed(&[Role::Doctor]),
            BTreeSet::from([Role::SuperAdmin, Role::Admin, Role::Doctor])
        );
        assert_eq!(expand_allowed(&[Role::Patient]), BTreeSet::from([Role::SuperAdmin, Role::Patient]));
        assert_eq!(expand_allowed(&[Role::SuperAdmin]), BTreeSet::from([Role::SuperAdmin]));
        assert!(expand_allowed(&[]).is_empty());
    }
}

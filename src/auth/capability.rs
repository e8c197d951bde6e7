//! Role → capability mapping and the scope rules that go with it.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use strum_macros::{Display, EnumString};

use crate::error::{AppError, AppResult};
use crate::model::employee::{EmpId, Employee};
use crate::model::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Capability {
    /// Build monthly attendance, edit the cycle, toggle payslip freeze.
    AttendanceAdmin,
    /// Generate payslips, backfill bank details, read every payslip.
    PayrollAdmin,
    /// Decide leave and attendance requests within approver scope.
    LeaveApprover,
    /// Read one's own frozen summary and payslip.
    SelfReader,
}

const ALL: [Capability; 4] = [
    Capability::AttendanceAdmin,
    Capability::PayrollAdmin,
    Capability::LeaveApprover,
    Capability::SelfReader,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCapabilities(HashMap<Role, HashSet<Capability>>);

impl Default for RoleCapabilities {
    fn default() -> Self {
        let mut map = HashMap::new();
        map.insert(Role::Admin, ALL.into_iter().collect());
        map.insert(Role::Hr, ALL.into_iter().collect());
        map.insert(
            Role::Manager,
            [Capability::LeaveApprover, Capability::SelfReader].into_iter().collect(),
        );
        map.insert(Role::Employee, [Capability::SelfReader].into_iter().collect());
        map.insert(Role::FrontDesk, [Capability::SelfReader].into_iter().collect());
        Self(map)
    }
}

impl RoleCapabilities {
    /// Parse `Admin=AttendanceAdmin|PayrollAdmin;Employee=SelfReader`.
    /// Roles left out of the string get no capabilities.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut map: HashMap<Role, HashSet<Capability>> = HashMap::new();

        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (role, caps) = entry
                .split_once('=')
                .ok_or_else(|| format!("expected ROLE=CAPS, got {entry:?}"))?;
            let role = Role::from_str(role.trim()).map_err(|_| format!("unknown role {role:?}"))?;

            let set = map.entry(role).or_default();
            for cap in caps.split('|').map(str::trim).filter(|c| !c.is_empty()) {
                let cap = Capability::from_str(cap).map_err(|_| format!("unknown capability {cap:?}"))?;
                set.insert(cap);
            }
        }

        if map.is_empty() {
            return Err("no role mappings given".into());
        }
        Ok(Self(map))
    }

    pub fn has(&self, role: Role, capability: Capability) -> bool {
        self.0.get(&role).is_some_and(|caps| caps.contains(&capability))
    }

    pub fn for_role(&self, role: Role) -> HashSet<Capability> {
        self.0.get(&role).cloned().unwrap_or_default()
    }
}

/// Whether `approver` may decide a leave or request raised by `applicant`.
/// Nobody decides their own; Admin and HR decide for anyone else; a
/// Manager only for direct reports.
pub fn check_approver(role: Role, approver: Option<&EmpId>, applicant: &Employee) -> AppResult<()> {
    if approver == Some(&applicant.empid) {
        return Err(AppError::precondition("applicants cannot decide their own requests"));
    }

    match role {
        Role::Admin | Role::Hr => Ok(()),
        Role::Manager => match (approver, applicant.manager_empid.as_ref()) {
            (Some(me), Some(manager)) if me == manager => Ok(()),
            _ => Err(AppError::forbidden(format!(
                "employee {} does not report to this manager",
                applicant.empid
            ))),
        },
        Role::Employee | Role::FrontDesk => Err(AppError::forbidden("role cannot approve requests")),
    }
}

/// Which summary/payslip rows a caller may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadScope {
    Everything,
    OwnFrozen(EmpId),
}

impl ReadScope {
    pub fn allows(&self, owner: &EmpId, frozen: bool) -> bool {
        match self {
            ReadScope::Everything => true,
            ReadScope::OwnFrozen(me) => frozen && me == owner,
        }
    }

    /// Restrict a requested empid filter to what the scope permits.
    pub fn narrow(&self, requested: Option<EmpId>) -> AppResult<Option<EmpId>> {
        match (self, requested) {
            (ReadScope::Everything, requested) => Ok(requested),
            (ReadScope::OwnFrozen(me), None) => Ok(Some(me.clone())),
            (ReadScope::OwnFrozen(me), Some(other)) if &other == me => Ok(Some(other)),
            (ReadScope::OwnFrozen(_), Some(other)) => {
                Err(AppError::forbidden(format!("cannot read records of employee {other}")))
            }
        }
    }

    pub fn frozen_only(&self) -> bool {
        matches!(self, ReadScope::OwnFrozen(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> EmpId {
        EmpId::parse(raw).unwrap()
    }

    #[test]
    fn default_mapping() {
        let caps = RoleCapabilities::default();
        assert!(caps.has(Role::Admin, Capability::PayrollAdmin));
        assert!(caps.has(Role::Hr, Capability::AttendanceAdmin));
        assert!(caps.has(Role::Manager, Capability::LeaveApprover));
        assert!(!caps.has(Role::Manager, Capability::PayrollAdmin));
        assert!(caps.has(Role::Employee, Capability::SelfReader));
        assert!(!caps.has(Role::FrontDesk, Capability::LeaveApprover));
    }

    #[test]
    fn parses_configured_mapping() {
        let caps = RoleCapabilities::parse(
            "Admin=AttendanceAdmin|PayrollAdmin|LeaveApprover|SelfReader; HR=PayrollAdmin ;Employee=SelfReader",
        )
        .unwrap();
        assert!(caps.has(Role::Hr, Capability::PayrollAdmin));
        assert!(!caps.has(Role::Hr, Capability::AttendanceAdmin));
        assert!(caps.for_role(Role::Manager).is_empty());
    }

    #[test]
    fn rejects_bad_mapping() {
        assert!(RoleCapabilities::parse("").is_err());
        assert!(RoleCapabilities::parse("Admin").is_err());
        assert!(RoleCapabilities::parse("Intern=SelfReader").is_err());
        assert!(RoleCapabilities::parse("Admin=Everything").is_err());
    }

    #[test]
    fn nobody_approves_themselves() {
        let applicant = Employee::sample("1001");
        let err = check_approver(Role::Admin, Some(&id("1001")), &applicant).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
        let err = check_approver(Role::Hr, Some(&id("1001")), &applicant).unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
    }

    #[test]
    fn managers_approve_direct_reports_only() {
        let mut applicant = Employee::sample("1001");
        applicant.manager_empid = Some(id("2000"));

        assert!(check_approver(Role::Manager, Some(&id("2000")), &applicant).is_ok());
        assert!(matches!(
            check_approver(Role::Manager, Some(&id("2001")), &applicant),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_approver(Role::Manager, None, &applicant).is_err());
        assert!(check_approver(Role::Hr, Some(&id("3000")), &applicant).is_ok());
        assert!(check_approver(Role::Admin, None, &applicant).is_ok());
        assert!(check_approver(Role::Employee, Some(&id("3000")), &applicant).is_err());
    }

    #[test]
    fn self_readers_see_only_their_frozen_rows() {
        let scope = ReadScope::OwnFrozen(id("1001"));
        assert!(scope.allows(&id("1001"), true));
        assert!(!scope.allows(&id("1001"), false));
        assert!(!scope.allows(&id("1002"), true));

        assert!(ReadScope::Everything.allows(&id("1002"), false));
    }

    #[test]
    fn narrow_pins_self_readers_to_own_empid() {
        let scope = ReadScope::OwnFrozen(id("1001"));
        assert_eq!(scope.narrow(None).unwrap(), Some(id("1001")));
        assert_eq!(scope.narrow(Some(id("01001"))).unwrap(), Some(id("1001")));
        assert!(matches!(scope.narrow(Some(id("1002"))), Err(AppError::Forbidden(_))));
        assert_eq!(ReadScope::Everything.narrow(None).unwrap(), None);
    }
}

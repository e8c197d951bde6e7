use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Role {
    #[strum(serialize = "Admin")]
    Admin = 1,
    #[strum(serialize = "HR")]
    Hr = 2,
    #[strum(serialize = "Employee")]
    Employee = 3,
    #[strum(serialize = "Manager")]
    Manager = 4,
    #[strum(serialize = "Front Desk", serialize = "FrontDesk")]
    FrontDesk = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::Manager),
            5 => Some(Role::FrontDesk),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Hr, Role::Employee, Role::Manager, Role::FrontDesk] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(6), None);
    }

    #[test]
    fn parses_display_names() {
        assert_eq!(Role::from_str("HR").unwrap(), Role::Hr);
        assert_eq!(Role::from_str("Front Desk").unwrap(), Role::FrontDesk);
        assert_eq!(Role::from_str("FrontDesk").unwrap(), Role::FrontDesk);
        assert!(Role::from_str("Intern").is_err());
    }
}

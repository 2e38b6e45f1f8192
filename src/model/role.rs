#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }

    /// Roles allowed to trigger batch jobs outside their schedule.
    pub fn can_run_jobs(&self) -> bool {
        matches!(self, Role::Admin | Role::Hr | Role::System)
    }

    /// Roles allowed to forward raw device logs.
    pub fn can_push_device_logs(&self) -> bool {
        matches!(self, Role::Admin | Role::System | Role::ApiUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_id_maps_known_roles() {
        assert_eq!(Role::from_id(1), Some(Role::Admin));
        assert_eq!(Role::from_id(4), Some(Role::System));
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(6), None);
    }

    #[test]
    fn job_permissions() {
        assert!(Role::Hr.can_run_jobs());
        assert!(!Role::Employee.can_run_jobs());
        assert!(Role::ApiUser.can_push_device_logs());
        assert!(!Role::Hr.can_push_device_logs());
    }
}

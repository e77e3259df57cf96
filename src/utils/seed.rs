use anyhow::{Context, Result};
use tracing::info;

use crate::auth::password::hash_password;
use crate::model::role::Role;
use crate::model::user::User;
use crate::store::UserRepository;

struct DemoUser {
    id: &'static str,
    name: &'static str,
    email: &'static str,
    password: &'static str,
    role: Role,
    employee_id: &'static str,
    department: &'static str,
}

const DEMO_USERS: [DemoUser; 4] = [
    DemoUser {
        id: "1",
        name: "Manager User",
        email: "manager@company.com",
        password: "Manager@123",
        role: Role::Manager,
        employee_id: "MGR001",
        department: "IT",
    },
    DemoUser {
        id: "2",
        name: "Alice Johnson",
        email: "employee1@company.com",
        password: "Employee@123",
        role: Role::Employee,
        employee_id: "EMP001",
        department: "IT",
    },
    DemoUser {
        id: "3",
        name: "Bob Smith",
        email: "employee2@company.com",
        password: "Employee@123",
        role: Role::Employee,
        employee_id: "EMP002",
        department: "IT",
    },
    DemoUser {
        id: "4",
        name: "Carol Williams",
        email: "employee3@company.com",
        password: "Employee@123",
        role: Role::Employee,
        employee_id: "EMP003",
        department: "HR",
    },
];

/// Create the demo accounts when the user store is empty. Returns how many were added.
pub async fn seed_demo_users(users: &dyn UserRepository) -> Result<usize> {
    if !users.list_users().await?.is_empty() {
        return Ok(0);
    }

    for demo in &DEMO_USERS {
        let password = hash_password(demo.password)
            .map_err(|e| anyhow::anyhow!("hashing demo password: {e}"))?;
        let user = User {
            id: demo.id.to_string(),
            name: demo.name.to_string(),
            email: demo.email.to_string(),
            password,
            role: demo.role,
            employee_id: Some(demo.employee_id.to_string()),
            department: demo.department.to_string(),
        };
        users
            .insert_user(&user)
            .await
            .with_context(|| format!("seeding {}", demo.email))?;
    }

    info!(count = DEMO_USERS.len(), "Seeded demo users");
    Ok(DEMO_USERS.len())
}

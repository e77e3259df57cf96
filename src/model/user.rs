use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// A stored account. `password` is the argon2 PHC string and never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default = "default_department")]
    pub department: String,
}

pub fn default_department() -> String {
    "IT".to_string()
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            employee_id: self.employee_id.clone(),
            department: self.department.clone(),
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": "2",
    "name": "Alice Johnson",
    "email": "employee1@company.com",
    "role": "employee",
    "employeeId": "EMP001",
    "department": "IT"
}))]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[schema(nullable = true)]
    pub employee_id: Option<String>,
    pub department: String,
}

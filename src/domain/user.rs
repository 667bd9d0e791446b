/// Account role as reported by the chat service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserRole {
    Admin,
    #[default]
    User,
    Pending,
}

impl UserRole {
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "pending" => Self::Pending,
            _ => Self::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// An authenticated session: the signed-in user plus the bearer token
/// attached to REST calls and the real-time handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

//! User model
//!
//! Registered accounts. A user authors recipes, keeps favorites and a
//! shopping cart, and may subscribe to other authors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of an email address
pub const EMAIL_MAX_LEN: usize = 254;
/// Maximum length of username, first name and last name
pub const NAME_MAX_LEN: usize = 150;

/// User entity representing a registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, used for login)
    pub email: String,
    /// Username (unique)
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed with `services::password::hash_password()`.
    pub fn new(
        email: String,
        username: String,
        first_name: String,
        last_name: String,
        password_hash: String,
    ) -> Self {
        Self {
            id: 0, // Will be set by the database
            email,
            username,
            first_name,
            last_name,
            password_hash,
            created_at: Utc::now(),
        }
    }

    /// Check if the user owns content authored by `author_id`
    pub fn owns(&self, author_id: i64) -> bool {
        self.id == author_id
    }
}

/// Input for registering a new user (before password hashing)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Plaintext password (will be hashed)
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> User {
        let mut user = User::new(
            "cook@example.com".to_string(),
            "cook".to_string(),
            "Иван".to_string(),
            "Петров".to_string(),
            "hash".to_string(),
        );
        user.id = id;
        user
    }

    #[test]
    fn test_user_new() {
        let user = User::new(
            "cook@example.com".to_string(),
            "cook".to_string(),
            "Иван".to_string(),
            "Петров".to_string(),
            "hash".to_string(),
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.email, "cook@example.com");
        assert_eq!(user.username, "cook");
        assert_eq!(user.first_name, "Иван");
    }

    #[test]
    fn test_user_owns() {
        let user = user(2);
        assert!(user.owns(2));
        assert!(!user.owns(1));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user(1)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "cook");
    }
}

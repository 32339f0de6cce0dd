use std::sync::OnceLock;

use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::info;

use wishwall_core::{new_id, now_rfc3339};
use wishwall_sql::{Row, SQLError, Value};

use crate::model::{AuthResponse, LoginRequest, RegisterRequest, UpdateUser, User};
use crate::service::{WishError, WishService, clean_text, required_str};

const USER_COLUMNS: &str = "id, username, nickname, avatar_id, role, created_at, updated_at";

impl WishService {
    /// Register a new account and sign it in.
    pub fn register(&self, input: RegisterRequest) -> Result<AuthResponse, WishError> {
        validate_username(&input.username)?;
        if input.password.chars().count() < 6 {
            return Err(WishError::Validation(
                "password must be at least 6 characters".into(),
            ));
        }
        let nickname = match input.nickname.as_deref() {
            Some(n) if !n.trim().is_empty() => clean_text(n, "nickname", 32)?,
            _ => input.username.clone(),
        };
        let password_hash = hash_password(&input.password)?;

        let now = now_rfc3339();
        let user = User {
            id: new_id(),
            username: input.username,
            nickname,
            avatar_id: 0,
            role: "user".to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.sql
            .exec(
                "INSERT INTO users (id, username, password_hash, nickname, avatar_id, role, \
                 created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                &[
                    Value::from(user.id.as_str()),
                    Value::from(user.username.as_str()),
                    Value::Text(password_hash),
                    Value::from(user.nickname.as_str()),
                    Value::Integer(user.avatar_id),
                    Value::from(user.role.as_str()),
                    Value::from(user.created_at.as_str()),
                    Value::from(user.updated_at.as_str()),
                ],
            )
            .map_err(|e| match e {
                SQLError::UniqueViolation(_) => {
                    WishError::Conflict(format!("username '{}' is already taken", user.username))
                }
                other => WishError::from(other),
            })?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        self.auth_response(user)
    }

    /// Check credentials and issue a token.
    pub fn login(&self, input: LoginRequest) -> Result<AuthResponse, WishError> {
        let rows = self.sql.query(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?1"),
            &[Value::from(input.username.as_str())],
        )?;

        let invalid = || WishError::Unauthorized("invalid username or password".into());
        let Some(row) = rows.first() else {
            // Same argon2 cost as a real account, so unknown names are not
            // distinguishable by timing.
            verify_password(&input.password, dummy_hash());
            return Err(invalid());
        };
        let hash = row.get_str("password_hash").unwrap_or_default();
        if !verify_password(&input.password, hash) {
            return Err(invalid());
        }

        let user = row_to_user(row)?;
        info!(user_id = %user.id, "user logged in");
        self.auth_response(user)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: &str) -> Result<User, WishError> {
        let rows = self.sql.query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            &[Value::from(id)],
        )?;
        let row = rows
            .first()
            .ok_or_else(|| WishError::NotFound(format!("user '{id}' not found")))?;
        row_to_user(row)
    }

    /// Update nickname and/or avatar.
    pub fn update_user(&self, id: &str, patch: UpdateUser) -> Result<User, WishError> {
        let mut user = self.get_user(id)?;

        if let Some(nickname) = patch.nickname.as_deref() {
            user.nickname = clean_text(nickname, "nickname", 32)?;
        }
        if let Some(avatar_id) = patch.avatar_id {
            if avatar_id < 0 {
                return Err(WishError::Validation("avatarId must not be negative".into()));
            }
            user.avatar_id = avatar_id;
        }
        user.updated_at = now_rfc3339();

        self.sql.exec(
            "UPDATE users SET nickname = ?1, avatar_id = ?2, updated_at = ?3 WHERE id = ?4",
            &[
                Value::from(user.nickname.as_str()),
                Value::Integer(user.avatar_id),
                Value::from(user.updated_at.as_str()),
                Value::from(id),
            ],
        )?;
        Ok(user)
    }

    /// Verify a bearer token and make sure its user still exists.
    pub fn authenticate(&self, token: &str) -> Result<crate::model::Claims, WishError> {
        let claims = self.jwt.verify(token)?;
        let rows = self.sql.query(
            "SELECT 1 AS hit FROM users WHERE id = ?1",
            &[Value::from(claims.sub.as_str())],
        )?;
        if rows.is_empty() {
            return Err(WishError::Unauthorized("account no longer exists".into()));
        }
        Ok(claims)
    }

    fn auth_response(&self, user: User) -> Result<AuthResponse, WishError> {
        let access_token = self.jwt.issue(&user.id, &user.username)?;
        Ok(AuthResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.expire_secs(),
            user,
        })
    }
}

/// 3–32 characters of ASCII letters, digits and underscore.
fn validate_username(name: &str) -> Result<(), WishError> {
    let len = name.chars().count();
    if !(3..=32).contains(&len) {
        return Err(WishError::Validation(
            "username must be 3 to 32 characters".into(),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(WishError::Validation(
            "username may only contain letters, digits and '_'".into(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, WishError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| WishError::Internal(format!("password hash: {e}")))
}

/// Hash checked against when the username does not exist.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("wishwall-absent-user").unwrap_or_default())
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub(crate) fn row_to_user(row: &Row) -> Result<User, WishError> {
    Ok(User {
        id: required_str(row, "id")?,
        username: required_str(row, "username")?,
        nickname: required_str(row, "nickname")?,
        avatar_id: row.get_i64("avatar_id").unwrap_or(0),
        role: required_str(row, "role")?,
        created_at: required_str(row, "created_at")?,
        updated_at: required_str(row, "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use crate::model::{LoginRequest, RegisterRequest, UpdateUser};
    use crate::service::WishError;
    use crate::service::testutil::test_service;

    use super::{dummy_hash, verify_password};

    fn register(name: &str) -> RegisterRequest {
        RegisterRequest {
            username: name.into(),
            password: "secret123".into(),
            nickname: None,
        }
    }

    #[test]
    fn register_login_roundtrip() {
        let svc = test_service();
        let reg = svc.register(register("alice")).unwrap();
        assert_eq!(reg.user.username, "alice");
        assert_eq!(reg.user.nickname, "alice");
        assert_eq!(reg.token_type, "Bearer");

        let claims = svc.authenticate(&reg.access_token).unwrap();
        assert_eq!(claims.sub, reg.user.id);

        let login = svc
            .login(LoginRequest {
                username: "alice".into(),
                password: "secret123".into(),
            })
            .unwrap();
        assert_eq!(login.user.id, reg.user.id);

        let bad = svc.login(LoginRequest {
            username: "alice".into(),
            password: "wrong-password".into(),
        });
        assert!(matches!(bad, Err(WishError::Unauthorized(_))));

        let unknown = svc.login(LoginRequest {
            username: "nobody".into(),
            password: "secret123".into(),
        });
        assert!(matches!(unknown, Err(WishError::Unauthorized(_))));
    }

    #[test]
    fn unknown_user_is_checked_against_a_real_hash() {
        let hash = dummy_hash();
        assert!(hash.starts_with("$argon2id$"), "{hash}");
        assert!(password_hash::PasswordHash::new(hash).is_ok());
        assert!(!verify_password("secret123", hash));
        assert_eq!(dummy_hash(), hash);
    }

    #[test]
    fn duplicate_username_conflicts() {
        let svc = test_service();
        svc.register(register("bob")).unwrap();
        assert!(matches!(
            svc.register(register("bob")),
            Err(WishError::Conflict(_))
        ));
    }

    #[test]
    fn register_validation() {
        let svc = test_service();
        assert!(matches!(svc.register(register("ab")), Err(WishError::Validation(_))));
        assert!(matches!(
            svc.register(register("has space")),
            Err(WishError::Validation(_))
        ));
        let short_pw = RegisterRequest {
            username: "carol".into(),
            password: "123".into(),
            nickname: None,
        };
        assert!(matches!(svc.register(short_pw), Err(WishError::Validation(_))));
    }

    #[test]
    fn update_profile() {
        let svc = test_service();
        let reg = svc.register(register("dave")).unwrap();
        let updated = svc
            .update_user(
                &reg.user.id,
                UpdateUser {
                    nickname: Some("  Davey ".into()),
                    avatar_id: Some(4),
                },
            )
            .unwrap();
        assert_eq!(updated.nickname, "Davey");
        assert_eq!(updated.avatar_id, 4);

        let fetched = svc.get_user(&reg.user.id).unwrap();
        assert_eq!(fetched.nickname, "Davey");

        let neg = svc.update_user(
            &reg.user.id,
            UpdateUser {
                nickname: None,
                avatar_id: Some(-1),
            },
        );
        assert!(matches!(neg, Err(WishError::Validation(_))));
        assert!(matches!(svc.get_user("missing"), Err(WishError::NotFound(_))));
    }
}

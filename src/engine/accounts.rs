//! Account lifecycle: signup, login, activation, profile edits.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Datelike;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{
    EmployeeQuery, EmployeeSummary, GroupCount, LookupItem, LookupKind, SignupRequest,
    SystemSettings, UpdateEmployeeRequest, User, UserRole,
};

use super::{is_unique_violation, new_id, now_rfc3339, EngineError, EngineResult};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// `EMP-<year>-<yearSeq>-<globalSeq>`
pub fn format_employee_id(year: i32, year_seq: i64, global_seq: i64) -> String {
    format!("EMP-{}-{:03}-{:04}", year, year_seq, global_seq)
}

/// Fields for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
}

impl From<SignupRequest> for NewUser {
    fn from(req: SignupRequest) -> Self {
        Self {
            username: req.username.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            password: req.password,
            full_name: req.full_name.trim().to_string(),
            department: non_empty(req.department),
            position: non_empty(req.position),
            location: non_empty(req.location),
            phone: non_empty(req.phone),
            role: UserRole::Employee,
            is_active: false,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Signup: creates an inactive employee account awaiting admin activation
pub async fn register(db: &SqlitePool, req: SignupRequest) -> EngineResult<User> {
    let settings = SystemSettings::load(db).await?;
    if !settings.signup_enabled {
        return Err(EngineError::Forbidden("Signup is currently disabled".to_string()));
    }

    let new_user = NewUser::from(req);
    check_lookup(db, LookupKind::Department, new_user.department.as_deref()).await?;
    check_lookup(db, LookupKind::Zone, new_user.location.as_deref()).await?;
    check_lookup(db, LookupKind::Role, new_user.position.as_deref()).await?;

    let user = create_user(db, new_user).await?;
    info!(user_id = %user.id, employee_id = %user.employee_id, "New signup awaiting activation");
    Ok(user)
}

async fn check_lookup(db: &SqlitePool, kind: LookupKind, value: Option<&str>) -> EngineResult<()> {
    if let Some(name) = value {
        if !LookupItem::name_exists(db, kind, name).await? {
            return Err(EngineError::Validation(format!(
                "Unknown {}: {}",
                kind.label().to_lowercase(),
                name
            )));
        }
    }
    Ok(())
}

/// Insert an account, assigning its immutable employee id
pub async fn create_user(db: &SqlitePool, new_user: NewUser) -> EngineResult<User> {
    let taken: Option<(String, String)> =
        sqlx::query_as("SELECT username, email FROM users WHERE username = ? OR email = ?")
            .bind(&new_user.username)
            .bind(&new_user.email)
            .fetch_optional(db)
            .await?;
    if let Some((username, _)) = taken {
        return Err(EngineError::Validation(if username == new_user.username {
            "Username is already taken".to_string()
        } else {
            "Email is already registered".to_string()
        }));
    }

    let password_hash = hash_password(&new_user.password)
        .map_err(|e| EngineError::PasswordHash(e.to_string()))?;

    let now = chrono::Utc::now();
    let year = now.year();
    let global_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await?;
    let year_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at LIKE ?")
        .bind(format!("{}-%", year))
        .fetch_one(db)
        .await?;
    let employee_id = format_employee_id(year, year_count + 1, global_count + 1);

    let id = new_id();
    let timestamp = now.to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, full_name, employee_id,
                           department, position, location, phone, role, is_active,
                           created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(&password_hash)
    .bind(&new_user.full_name)
    .bind(&employee_id)
    .bind(&new_user.department)
    .bind(&new_user.position)
    .bind(&new_user.location)
    .bind(&new_user.phone)
    .bind(new_user.role.to_string())
    .bind(new_user.is_active)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            EngineError::Conflict("Account could not be created, please try again".to_string())
        } else {
            EngineError::Database(e)
        }
    })?;

    User::find_by_id(db, &id)
        .await?
        .ok_or(EngineError::NotFound("User"))
}

/// Check credentials for login
pub async fn authenticate(db: &SqlitePool, login: &str, password: &str) -> EngineResult<User> {
    let user = User::find_by_login(db, login.trim())
        .await?
        .ok_or(EngineError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash) {
        return Err(EngineError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(EngineError::Forbidden("Account is pending activation".to_string()));
    }

    Ok(user)
}

pub async fn change_password(
    db: &SqlitePool,
    user: &User,
    current_password: &str,
    new_password: &str,
) -> EngineResult<()> {
    if !verify_password(current_password, &user.password_hash) {
        return Err(EngineError::Validation("Current password is incorrect".to_string()));
    }

    let password_hash = hash_password(new_password)
        .map_err(|e| EngineError::PasswordHash(e.to_string()))?;

    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(now_rfc3339())
        .bind(&user.id)
        .execute(db)
        .await?;

    info!(user_id = %user.id, "Password changed");
    Ok(())
}

/// Profile edit. Employees may change their own name and phone; everything
/// else, including activation, requires an HR admin.
pub async fn update_employee(
    db: &SqlitePool,
    actor: &User,
    target_id: &str,
    req: UpdateEmployeeRequest,
) -> EngineResult<User> {
    if !actor.is_privileged() {
        if actor.id != target_id {
            return Err(EngineError::Forbidden(
                "You can only edit your own profile".to_string(),
            ));
        }
        if req.has_admin_fields() {
            return Err(EngineError::NotAuthorized);
        }
    }

    let target = User::find_by_id(db, target_id)
        .await?
        .ok_or(EngineError::NotFound("Employee"))?;

    let department = non_empty(req.department);
    let location = non_empty(req.location);
    let position = non_empty(req.position);
    check_lookup(db, LookupKind::Department, department.as_deref()).await?;
    check_lookup(db, LookupKind::Zone, location.as_deref()).await?;
    check_lookup(db, LookupKind::Role, position.as_deref()).await?;

    sqlx::query(
        r#"
        UPDATE users SET
            full_name = COALESCE(?, full_name),
            phone = COALESCE(?, phone),
            department = COALESCE(?, department),
            position = COALESCE(?, position),
            location = COALESCE(?, location),
            role = COALESCE(?, role),
            is_active = COALESCE(?, is_active),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(non_empty(req.full_name))
    .bind(req.phone.map(|p| p.trim().to_string()))
    .bind(&department)
    .bind(&position)
    .bind(&location)
    .bind(req.role.map(|r| r.to_string()))
    .bind(req.is_active)
    .bind(now_rfc3339())
    .bind(&target.id)
    .execute(db)
    .await?;

    if let Some(active) = req.is_active {
        if active != target.is_active {
            info!(user_id = %target.id, actor = %actor.id, active, "Account activation changed");
        }
    }

    User::find_by_id(db, &target.id)
        .await?
        .ok_or(EngineError::NotFound("Employee"))
}

pub async fn list_employees(db: &SqlitePool, query: &EmployeeQuery) -> EngineResult<Vec<User>> {
    let limit = query.limit.unwrap_or(200).clamp(1, 1000);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(full_name LIKE ? OR email LIKE ? OR employee_id LIKE ?)".to_string());
        let pattern = format!("%{}%", search);
        bindings.push(pattern.clone());
        bindings.push(pattern.clone());
        bindings.push(pattern);
    }

    if let Some(department) = &query.department {
        conditions.push("department = ?".to_string());
        bindings.push(department.clone());
    }

    if let Some(role) = &query.role {
        conditions.push("role = ?".to_string());
        bindings.push(role.clone());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT * FROM users {} ORDER BY full_name ASC LIMIT ? OFFSET ?",
        where_clause
    );
    let mut query_builder = sqlx::query_as::<_, User>(&sql);
    for binding in &bindings {
        query_builder = query_builder.bind(binding);
    }
    let users = query_builder.bind(limit).bind(offset).fetch_all(db).await?;
    Ok(users)
}

pub async fn employee_summary(db: &SqlitePool) -> EngineResult<EmployeeSummary> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await?;
    let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
        .fetch_one(db)
        .await?;

    let by_department: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT COALESCE(department, 'Unassigned') AS key, COUNT(*) AS count
        FROM users GROUP BY key ORDER BY count DESC, key ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    let by_role: Vec<(String, i64)> =
        sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role ASC")
            .fetch_all(db)
            .await?;

    let to_counts = |rows: Vec<(String, i64)>| {
        rows.into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect()
    };

    Ok(EmployeeSummary {
        total,
        active,
        pending_activation: total - active,
        by_department: to_counts(by_department),
        by_role: to_counts(by_role),
    })
}

/// Create the configured bootstrap admin when no admin account exists yet
pub async fn ensure_admin_user(
    db: &SqlitePool,
    username: &str,
    email: &str,
    password: Option<&str>,
) -> EngineResult<()> {
    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(db)
        .await?;
    if admins > 0 {
        return Ok(());
    }

    let Some(password) = password else {
        tracing::warn!("No admin account exists and auth.admin_password is not set");
        return Ok(());
    };

    let admin = create_user(
        db,
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            full_name: "Administrator".to_string(),
            department: None,
            position: None,
            location: None,
            phone: None,
            role: UserRole::Admin,
            is_active: true,
        },
    )
    .await?;

    info!(user_id = %admin.id, "Created bootstrap admin user: {}", admin.username);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_id_format() {
        assert_eq!(format_employee_id(2026, 3, 42), "EMP-2026-003-0042");
        assert_eq!(format_employee_id(2027, 1, 12345), "EMP-2027-001-12345");
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("anything", "not-a-hash"));
    }

    #[test]
    fn test_signup_normalizes_fields() {
        let new_user = NewUser::from(SignupRequest {
            username: " jdoe ".into(),
            email: "J.Doe@Example.com".into(),
            password: "secret123".into(),
            full_name: "Jane Doe".into(),
            department: Some("  ".into()),
            position: None,
            location: Some("North".into()),
            phone: None,
        });
        assert_eq!(new_user.username, "jdoe");
        assert_eq!(new_user.email, "j.doe@example.com");
        assert_eq!(new_user.department, None);
        assert_eq!(new_user.location.as_deref(), Some("North"));
        assert_eq!(new_user.role, UserRole::Employee);
        assert!(!new_user.is_active);
    }

    #[tokio::test]
    async fn test_login_by_email_ignores_case() {
        let db = crate::db::init_memory().await.unwrap();
        crate::db::seed_defaults(&db, &crate::config::LeaveDefaults::default())
            .await
            .unwrap();

        let user = register(
            &db,
            SignupRequest {
                username: "jdoe".into(),
                email: "J.Doe@Example.com".into(),
                password: "secret123".into(),
                full_name: "Jane Doe".into(),
                department: None,
                position: None,
                location: None,
                phone: None,
            },
        )
        .await
        .unwrap();
        sqlx::query("UPDATE users SET is_active = 1 WHERE id = ?")
            .bind(&user.id)
            .execute(&db)
            .await
            .unwrap();

        for login in ["J.Doe@Example.com", " j.doe@EXAMPLE.com ", "jdoe"] {
            let found = authenticate(&db, login, "secret123").await.unwrap();
            assert_eq!(found.id, user.id, "login as {login:?}");
        }
        assert!(matches!(
            authenticate(&db, "JDOE", "secret123").await,
            Err(EngineError::InvalidCredentials)
        ));
    }
}

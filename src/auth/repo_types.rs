use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub email: String,           // primary key, stored as submitted
    pub password_hash: String,   // Argon2 PHC string
    pub activation_code: String, // 4 digits, zero padded
    pub code_expires_at: f64,    // unix seconds, sub-second precision
    pub is_active: bool,
}

/// Fields needed to insert a pending user.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub activation_code: &'a str,
    pub code_expires_at: f64,
}

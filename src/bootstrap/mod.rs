use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher};
use chrono::Utc;
use diesel::prelude::*;
use tracing::info;
use uuid::Uuid;

use crate::config::AdminConfig;
use crate::shared::models::User;
use crate::shared::schema::users;
use crate::shared::utils::DbPool;

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))
}

/// Idempotent create-or-update of the default staff account. Invoked
/// explicitly once at server start, after migrations; CLI subcommands
/// skip it. The known password is always re-applied so a reset admin
/// credential survives restarts.
pub fn ensure_default_admin(pool: &DbPool, admin: &AdminConfig) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    let password_hash = hash_password(&admin.password)?;

    let existing: Option<User> = users::table
        .filter(users::username.eq(&admin.username))
        .first(&mut conn)
        .optional()?;

    match existing {
        Some(user) => {
            let email = if user.email.is_empty() {
                admin.email.clone()
            } else {
                user.email
            };
            diesel::update(users::table.find(user.id))
                .set((
                    users::is_staff.eq(true),
                    users::email.eq(email),
                    users::password_hash.eq(password_hash),
                ))
                .execute(&mut conn)?;
            info!(username = %admin.username, "default admin refreshed");
        }
        None => {
            let user = User {
                id: Uuid::new_v4(),
                username: admin.username.clone(),
                email: admin.email.clone(),
                password_hash,
                is_staff: true,
                created_at: Utc::now(),
            };
            diesel::insert_into(users::table)
                .values(&user)
                .execute(&mut conn)?;
            info!(username = %admin.username, "default admin created");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashes_are_salted() {
        let a = hash_password("admin12345").unwrap();
        let b = hash_password("admin12345").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
    }
}

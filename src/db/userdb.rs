// db/userdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::{User, VerificationStatus};

#[async_trait]
pub trait UserExt {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        phone_number: Option<&str>,
        google_id: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn save_user<T: Into<String> + Send>(
        &self,
        name: Option<String>,
        email: T,
        password: T,
    ) -> Result<User, sqlx::Error>;

    async fn upsert_google_user(
        &self,
        google_id: &str,
        email: Option<&str>,
        name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<User, sqlx::Error>;

    async fn get_or_create_phone_user(&self, phone_number: &str) -> Result<User, sqlx::Error>;

    async fn update_user_name<T: Into<String> + Send>(
        &self,
        user_id: Uuid,
        name: T,
    ) -> Result<User, sqlx::Error>;

    async fn complete_profile(
        &self,
        user_id: Uuid,
        name: String,
        birth_year: i32,
        app_language: Option<String>,
    ) -> Result<User, sqlx::Error>;

    async fn update_user_skills(
        &self,
        user_id: Uuid,
        skills: Vec<String>,
    ) -> Result<User, sqlx::Error>;

    async fn update_user_location(
        &self,
        user_id: Uuid,
        location: Option<String>,
    ) -> Result<User, sqlx::Error>;

    async fn update_verification_status(
        &self,
        user_id: Uuid,
        status: VerificationStatus,
    ) -> Result<Option<User>, sqlx::Error>;

    async fn get_leaderboard(&self, limit: i64) -> Result<Vec<User>, sqlx::Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        phone_number: Option<&str>,
        google_id: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, email, phone_number, password, google_id, photo_url,
                       role, wallet_balance, xp, verification_status, skills, location,
                       birth_year, app_language, profile_completed, created_at, updated_at
                FROM users WHERE id = $1
                "#,
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, email, phone_number, password, google_id, photo_url,
                       role, wallet_balance, xp, verification_status, skills, location,
                       birth_year, app_language, profile_completed, created_at, updated_at
                FROM users WHERE LOWER(email) = LOWER($1)
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(phone_number) = phone_number {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, email, phone_number, password, google_id, photo_url,
                       role, wallet_balance, xp, verification_status, skills, location,
                       birth_year, app_language, profile_completed, created_at, updated_at
                FROM users WHERE phone_number = $1
                "#,
            )
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(google_id) = google_id {
            user = sqlx::query_as::<_, User>(
                r#"
                SELECT id, name, email, phone_number, password, google_id, photo_url,
                       role, wallet_balance, xp, verification_status, skills, location,
                       birth_year, app_language, profile_completed, created_at, updated_at
                FROM users WHERE google_id = $1
                "#,
            )
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn save_user<T: Into<String> + Send>(
        &self,
        name: Option<String>,
        email: T,
        password: T,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password)
            VALUES ($1, LOWER($2), $3)
            RETURNING id, name, email, phone_number, password, google_id, photo_url,
                      role, wallet_balance, xp, verification_status, skills, location,
                      birth_year, app_language, profile_completed, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email.into())
        .bind(password.into())
        .fetch_one(&self.pool)
        .await
    }

    async fn upsert_google_user(
        &self,
        google_id: &str,
        email: Option<&str>,
        name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // An existing email account picks up the Google identity.
        if let Some(email) = email {
            let linked = sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET google_id = $1,
                    photo_url = COALESCE(photo_url, $3),
                    name = COALESCE(name, $4),
                    updated_at = NOW()
                WHERE LOWER(email) = LOWER($2) AND google_id IS NULL
                RETURNING id, name, email, phone_number, password, google_id, photo_url,
                          role, wallet_balance, xp, verification_status, skills, location,
                          birth_year, app_language, profile_completed, created_at, updated_at
                "#,
            )
            .bind(google_id)
            .bind(email)
            .bind(photo_url)
            .bind(name)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(user) = linked {
                tx.commit().await?;
                return Ok(user);
            }
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (google_id, email, name, photo_url)
            VALUES ($1, LOWER($2), $3, $4)
            ON CONFLICT (google_id) DO UPDATE
            SET photo_url = COALESCE(EXCLUDED.photo_url, users.photo_url),
                updated_at = NOW()
            RETURNING id, name, email, phone_number, password, google_id, photo_url,
                      role, wallet_balance, xp, verification_status, skills, location,
                      birth_year, app_language, profile_completed, created_at, updated_at
            "#,
        )
        .bind(google_id)
        .bind(email)
        .bind(name)
        .bind(photo_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn get_or_create_phone_user(&self, phone_number: &str) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (phone_number)
            VALUES ($1)
            ON CONFLICT (phone_number) DO UPDATE SET updated_at = NOW()
            RETURNING id, name, email, phone_number, password, google_id, photo_url,
                      role, wallet_balance, xp, verification_status, skills, location,
                      birth_year, app_language, profile_completed, created_at, updated_at
            "#,
        )
        .bind(phone_number)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_name<T: Into<String> + Send>(
        &self,
        user_id: Uuid,
        name: T,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, name, email, phone_number, password, google_id, photo_url,
                      role, wallet_balance, xp, verification_status, skills, location,
                      birth_year, app_language, profile_completed, created_at, updated_at
            "#,
        )
        .bind(name.into())
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn complete_profile(
        &self,
        user_id: Uuid,
        name: String,
        birth_year: i32,
        app_language: Option<String>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2,
                birth_year = $3,
                app_language = COALESCE($4, app_language),
                profile_completed = TRUE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone_number, password, google_id, photo_url,
                      role, wallet_balance, xp, verification_status, skills, location,
                      birth_year, app_language, profile_completed, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(birth_year)
        .bind(app_language)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_skills(
        &self,
        user_id: Uuid,
        skills: Vec<String>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET skills = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone_number, password, google_id, photo_url,
                      role, wallet_balance, xp, verification_status, skills, location,
                      birth_year, app_language, profile_completed, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(skills)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_user_location(
        &self,
        user_id: Uuid,
        location: Option<String>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET location = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone_number, password, google_id, photo_url,
                      role, wallet_balance, xp, verification_status, skills, location,
                      birth_year, app_language, profile_completed, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(location)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_verification_status(
        &self,
        user_id: Uuid,
        status: VerificationStatus,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET verification_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone_number, password, google_id, photo_url,
                      role, wallet_balance, xp, verification_status, skills, location,
                      birth_year, app_language, profile_completed, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_leaderboard(&self, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone_number, password, google_id, photo_url,
                   role, wallet_balance, xp, verification_status, skills, location,
                   birth_year, app_language, profile_completed, created_at, updated_at
            FROM users
            ORDER BY xp DESC, created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

// src/db/users_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::users::User};

// Diretório de usuários: o motor só resolve atores e donos, nunca cadastra.
#[derive(Clone)]
pub struct UsersRepository {
    pool: PgPool,
}

impl UsersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Resolve o ator do cabeçalho x-user-id; usa o pool direto porque
    // o middleware roda fora de qualquer transação.
    pub async fn find_active(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, is_active, created_at
             FROM users
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_active_on<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, is_active, created_at
             FROM users
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }
}

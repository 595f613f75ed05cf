use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    models::{Role, User},
    repository::UserRepository,
};

#[derive(Clone)]
pub struct SeaOrmUserRepository {
    conn: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = Users::find()
            .filter(UserCol::Email.eq(email))
            .one(&self.conn)
            .await?;
        Ok(user.map(user_from_entity))
    }

    async fn create(&self, email: &str, password_hash: &str, role: &str) -> AppResult<User> {
        let user = UserActive {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            role: Set(role.to_string()),
            created_at: NotSet,
        }
        .insert(&self.conn)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::BadRequest("Email is already taken".to_string())
            }
            _ => err.into(),
        })?;

        Ok(user_from_entity(user))
    }
}

fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        role: Role::from_tag(&model.role),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

use bson::{doc, oid::ObjectId, DateTime};
use crewdesk_db::models::{GlobalRole, User};
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        email: String,
        username: String,
        display_name: String,
        password_hash: String,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            email,
            username,
            display_name,
            avatar: None,
            password_hash: Some(password_hash),
            global_role: GlobalRole::User,
            timezone: "UTC".to_string(),
            last_active_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email, "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_by_username(&self, username: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "username": username, "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: ObjectId,
        display_name: Option<String>,
        avatar: Option<String>,
        timezone: Option<String>,
    ) -> DaoResult<User> {
        let mut set = doc! {};
        if let Some(display_name) = display_name {
            set.insert("display_name", display_name);
        }
        if let Some(avatar) = avatar {
            set.insert("avatar", avatar);
        }
        if let Some(timezone) = timezone {
            set.insert("timezone", timezone);
        }
        if !set.is_empty() {
            self.base.update_by_id(user_id, doc! { "$set": set }).await?;
        }
        self.base.find_by_id(user_id).await
    }

    pub async fn touch_last_active(&self, user_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_by_id(
                user_id,
                doc! { "$set": { "last_active_at": DateTime::now() } },
            )
            .await
    }
}

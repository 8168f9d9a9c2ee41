//! Application state shared across handlers

use auth::{JwtService, repositories::UserRepository};
use sqlx::PgPool;

use crate::{
    repositories::{
        BusinessRepository, EventRepository, ForumCategoryRepository, ForumPostRepository,
        ForumThreadRepository, TourismImageRepository, TourismRepository,
    },
    uploads::UploadStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt: JwtService,
    pub users: UserRepository,
    pub businesses: BusinessRepository,
    pub events: EventRepository,
    pub tourism: TourismRepository,
    pub tourism_images: TourismImageRepository,
    pub forum_categories: ForumCategoryRepository,
    pub forum_threads: ForumThreadRepository,
    pub forum_posts: ForumPostRepository,
    pub uploads: UploadStore,
}

impl AppState {
    /// Build every repository over one shared pool
    pub fn new(pool: PgPool, jwt: JwtService, uploads: UploadStore) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            businesses: BusinessRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            tourism: TourismRepository::new(pool.clone()),
            tourism_images: TourismImageRepository::new(pool.clone()),
            forum_categories: ForumCategoryRepository::new(pool.clone()),
            forum_threads: ForumThreadRepository::new(pool.clone()),
            forum_posts: ForumPostRepository::new(pool.clone()),
            db_pool: pool,
            jwt,
            uploads,
        }
    }
}

pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use std::sync::Arc;

use crate::app::identity::AccessTokens;
use crate::app::media::MediaService;
use crate::app::posts::PostService;
use crate::infra::{storage::MediaStore, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub media: Arc<dyn MediaStore>,
    pub tokens: AccessTokens,
    pub admin_token: Option<String>,
    pub upload_max_bytes: usize,
    pub story_ttl: time::Duration,
}

impl AppState {
    pub fn media_service(&self) -> MediaService {
        MediaService::new(self.media.clone(), self.upload_max_bytes)
    }

    pub fn post_service(&self) -> PostService {
        PostService::new(self.store.clone(), self.media_service(), self.story_ttl)
    }
}

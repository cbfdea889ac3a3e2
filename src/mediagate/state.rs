//! Shared state for the generation routes.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::auth::Clock;
use crate::cache::ObjectCache;
use crate::generator::{Conversation, MediaGenerator, VideoHandle};

/// A cached multi-turn conversation and the session that started it.
#[derive(Clone, Debug)]
pub struct ChatSession {
    pub conversation: Conversation,
    pub owner: Uuid,
}

/// A generated video's backend handle, extendable only by the session that made it.
#[derive(Clone, Debug)]
pub struct CachedVideo {
    pub handle: VideoHandle,
    pub owner: Uuid,
}

pub struct MediaState {
    generator: Arc<dyn MediaGenerator>,
    videos: Arc<ObjectCache<CachedVideo>>,
    chats: Arc<ObjectCache<ChatSession>>,
    static_dir: PathBuf,
    outputs_dir: PathBuf,
}

impl MediaState {
    pub fn new(
        generator: Arc<dyn MediaGenerator>,
        clock: Arc<dyn Clock>,
        cache_ttl: Option<Duration>,
        static_dir: PathBuf,
        outputs_dir: PathBuf,
    ) -> Self {
        Self {
            generator,
            videos: Arc::new(ObjectCache::new(cache_ttl, clock.clone())),
            chats: Arc::new(ObjectCache::new(cache_ttl, clock)),
            static_dir,
            outputs_dir,
        }
    }

    #[must_use]
    pub fn generator(&self) -> &dyn MediaGenerator {
        self.generator.as_ref()
    }

    #[must_use]
    pub fn videos(&self) -> &Arc<ObjectCache<CachedVideo>> {
        &self.videos
    }

    #[must_use]
    pub fn chats(&self) -> &Arc<ObjectCache<ChatSession>> {
        &self.chats
    }

    #[must_use]
    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    #[must_use]
    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    /// Drops idle continuations from both caches.
    pub async fn sweep(&self) -> usize {
        self.videos.sweep().await + self.chats.sweep().await
    }

    pub async fn cached_objects(&self) -> usize {
        self.videos.len().await + self.chats.len().await
    }
}

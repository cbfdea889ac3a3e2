use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

use super::MediaState;
use crate::auth::AuthGate;

/// Periodically drop expired sessions and idle cache entries.
pub fn spawn_sweeper(
    auth: Arc<AuthGate>,
    media: Arc<MediaState>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let sessions = auth.sweep().await;
            let objects = media.sweep().await;
            if sessions > 0 || objects > 0 {
                debug!("Swept {sessions} sessions and {objects} cached objects");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{AuthConfig, Clock, ManualClock},
        generator::VideoHandle,
        mediagate::{state::tests::StubGenerator, CachedVideo},
    };
    use secrecy::SecretString;

    #[tokio::test]
    async fn sweeper_drops_idle_entries() {
        let clock = Arc::new(ManualClock::new(Duration::ZERO));
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let auth = Arc::new(AuthGate::new(
            AuthConfig::new("admin".to_string(), SecretString::from("pw".to_string())),
            dyn_clock.clone(),
        ));
        let media = Arc::new(MediaState::new(
            Arc::new(StubGenerator),
            dyn_clock,
            Some(Duration::from_secs(60)),
            "static".into(),
            "outputs".into(),
        ));
        media
            .videos()
            .insert(CachedVideo {
                handle: VideoHandle("vid".to_string()),
                owner: uuid::Uuid::new_v4(),
            })
            .await;

        let handle = spawn_sweeper(auth, media.clone(), Duration::from_millis(10));

        clock.advance(Duration::from_secs(61));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(media.cached_objects().await, 0);
        handle.abort();
    }
}

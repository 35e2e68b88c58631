//! Side channel that tells the relay who we are and which room we joined.
//!
//! The relay learns room membership only through `POST /update-name`; it then
//! echoes the announcement to every socket in the same room.

use tracing::{debug, warn};

use lanchat_shared::NameAnnouncement;

pub trait Announcer {
    /// Fire-and-forget. Failures are logged, never returned.
    fn announce(&self, announcement: &NameAnnouncement);
}

/// Posts announcements as JSON with `reqwest`, each in its own tokio task.
pub struct HttpAnnouncer {
    client: reqwest::Client,
    url: String,
}

impl HttpAnnouncer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl Announcer for HttpAnnouncer {
    fn announce(&self, announcement: &NameAnnouncement) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, announcement not sent");
            return;
        };

        let client = self.client.clone();
        let url = self.url.clone();
        let body = announcement.clone();

        runtime.spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(resp) => debug!(status = %resp.status(), address = %body.address, "Announcement posted"),
                Err(e) => warn!(url = %url, error = %e, "Announcement failed"),
            }
        });
    }
}

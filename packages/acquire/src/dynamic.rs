//! Dynamic acquisition: render the page in a headless browser.

use std::sync::Arc;
use std::time::Duration;

use crate::AcquireError;
use crate::browser::{
    BrowserBinding, BrowserDiscovery, SystemDiscovery, default_bindings, start_session,
};

/// Renders pages with the first browser that starts.
///
/// Cloning is cheap; discovery and bindings are shared.
#[derive(Clone)]
pub struct DynamicRenderer {
    discovery: Arc<dyn BrowserDiscovery>,
    bindings: Arc<[Box<dyn BrowserBinding>]>,
    user_agent: String,
}

impl DynamicRenderer {
    /// A renderer over the given discovery and bindings.
    #[must_use]
    pub fn new(
        discovery: Arc<dyn BrowserDiscovery>,
        bindings: Vec<Box<dyn BrowserBinding>>,
        user_agent: &str,
    ) -> Self {
        Self {
            discovery,
            bindings: bindings.into(),
            user_agent: user_agent.to_owned(),
        }
    }

    /// A renderer using installed browsers, Chrome first.
    #[must_use]
    pub fn system(user_agent: &str) -> Self {
        Self::new(
            Arc::new(SystemDiscovery::default()),
            default_bindings(),
            user_agent,
        )
    }

    /// Starts a browser, renders `url`, waits `settle`, and returns the
    /// DOM. The browser is shut down before returning on every path.
    ///
    /// Blocks the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::BrowserUnavailable`] if no browser starts and
    /// [`AcquireError::Browser`] if rendering fails.
    pub fn render_blocking(&self, url: &str, settle: Duration) -> Result<String, AcquireError> {
        let (kind, mut session) =
            start_session(self.discovery.as_ref(), &self.bindings, &self.user_agent)?;

        log::info!("Rendering {url} with {}", kind.label());
        let html = session.render(url, settle).map_err(AcquireError::Browser)?;
        drop(session);

        log::debug!("Rendered {} bytes from {url}", html.len());
        Ok(html)
    }

    /// [`Self::render_blocking`] on tokio's blocking pool.
    ///
    /// # Errors
    ///
    /// Same as [`Self::render_blocking`], plus [`AcquireError::Task`] if the
    /// blocking task panics.
    pub async fn render(&self, url: &str, settle: Duration) -> Result<String, AcquireError> {
        let renderer = self.clone();
        let url = url.to_owned();
        tokio::task::spawn_blocking(move || renderer.render_blocking(&url, settle)).await?
    }
}

impl std::fmt::Debug for DynamicRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicRenderer")
            .field(
                "bindings",
                &self.bindings.iter().map(|b| b.kind()).collect::<Vec<_>>(),
            )
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

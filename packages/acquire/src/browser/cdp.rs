//! [`BrowserBinding`] over the Chrome `DevTools` Protocol via
//! `headless_chrome`.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};

use super::{BrowserBinding, BrowserKind, BrowserSession};

/// Extra command-line flags for every launched browser.
const LAUNCH_ARGS: &[&str] = &["--disable-gpu", "--disable-dev-shm-usage"];

/// How long an idle browser is kept alive; must outlast the longest settle.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Launches a Chromium-family browser headless and drives it over CDP.
#[derive(Debug, Clone, Copy)]
pub struct CdpBinding {
    kind: BrowserKind,
}

impl CdpBinding {
    /// Creates a binding for `kind`.
    #[must_use]
    pub const fn new(kind: BrowserKind) -> Self {
        Self { kind }
    }
}

impl BrowserBinding for CdpBinding {
    fn kind(&self) -> BrowserKind {
        self.kind
    }

    fn launch(
        &self,
        executable: Option<&Path>,
        user_agent: &str,
    ) -> Result<Box<dyn BrowserSession>, String> {
        let options = LaunchOptions::default_builder()
            .path(executable.map(Path::to_path_buf))
            .headless(true)
            .sandbox(false)
            .idle_browser_timeout(IDLE_TIMEOUT)
            .args(LAUNCH_ARGS.iter().map(OsStr::new).collect())
            .build()
            .map_err(|e| e.to_string())?;

        let browser = Browser::new(options).map_err(|e| e.to_string())?;
        let tab = browser.new_tab().map_err(|e| e.to_string())?;
        tab.set_user_agent(user_agent, None, None)
            .map_err(|e| e.to_string())?;

        Ok(Box::new(CdpSession {
            kind: self.kind,
            _browser: browser,
            tab,
        }))
    }
}

/// A running browser with one open tab. Dropping it kills the browser
/// process.
struct CdpSession {
    kind: BrowserKind,
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession for CdpSession {
    fn render(&mut self, url: &str, settle: Duration) -> Result<String, String> {
        self.tab.navigate_to(url).map_err(|e| e.to_string())?;
        log::debug!("Waiting {}s for {url} to settle", settle.as_secs());
        std::thread::sleep(settle);
        self.tab.get_content().map_err(|e| e.to_string())
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        log::debug!("Closing {} session", self.kind.label());
        if let Err(e) = self.tab.close(false) {
            log::debug!("Failed to close tab: {e}");
        }
    }
}

//! Headless browser discovery, launch, and fallback.
//!
//! A [`BrowserDiscovery`] reports which Chromium-family browsers are
//! installed, in priority order. Each [`BrowserBinding`] knows how to start
//! a session for one [`BrowserKind`]. [`start_session`] tries the primary
//! binding first, then every secondary binding whose browser was
//! discovered, and reports all failures together if nothing starts.

pub mod cdp;
pub mod discovery;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use strum_macros::{AsRefStr, Display, EnumString};

pub use cdp::CdpBinding;
pub use discovery::SystemDiscovery;

/// Chromium-family browsers the renderer can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum BrowserKind {
    /// Google Chrome
    Chrome,
    /// Chromium
    Chromium,
    /// Microsoft Edge
    Edge,
    /// Brave
    Brave,
}

impl BrowserKind {
    /// Every kind, primary first.
    pub const ALL: &[Self] = &[Self::Chrome, Self::Chromium, Self::Edge, Self::Brave];

    /// Product name shown to users.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Chrome => "Google Chrome",
            Self::Chromium => "Chromium",
            Self::Edge => "Microsoft Edge",
            Self::Brave => "Brave",
        }
    }
}

/// An installed browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredBrowser {
    /// Which browser this is.
    pub kind: BrowserKind,
    /// Path to its executable.
    pub path: PathBuf,
}

/// Finds installed browsers.
pub trait BrowserDiscovery: Send + Sync {
    /// Installed browsers, most preferred first.
    fn discover(&self) -> Vec<DiscoveredBrowser>;
}

/// A live browser tab that can render pages.
///
/// Dropping the session shuts the browser down.
pub trait BrowserSession {
    /// Navigates to `url`, waits `settle`, and returns the rendered DOM as
    /// HTML.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure if navigation or reading the
    /// DOM fails.
    fn render(&mut self, url: &str, settle: Duration) -> Result<String, String>;
}

/// Starts sessions for one kind of browser.
pub trait BrowserBinding: Send + Sync {
    /// The browser this binding drives.
    fn kind(&self) -> BrowserKind;

    /// Launches a headless session.
    ///
    /// `executable` is the discovered binary, if any; without one the
    /// binding may try to locate the browser itself.
    ///
    /// # Errors
    ///
    /// Returns a description of why the browser could not be started.
    fn launch(
        &self,
        executable: Option<&Path>,
        user_agent: &str,
    ) -> Result<Box<dyn BrowserSession>, String>;
}

/// One failed launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAttempt {
    /// Browser that was tried.
    pub kind: BrowserKind,
    /// Executable used, if one was discovered.
    pub path: Option<PathBuf>,
    /// Why it failed.
    pub reason: String,
}

/// Every binding failed to start a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserUnavailable {
    /// Browsers found on this machine.
    pub discovered: Vec<DiscoveredBrowser>,
    /// Each launch that was tried, in order.
    pub attempts: Vec<LaunchAttempt>,
}

impl fmt::Display for BrowserUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not start a headless browser.")?;
        if self.discovered.is_empty() {
            write!(f, " No supported browser was found on this system.")?;
        }
        for attempt in &self.attempts {
            match &attempt.path {
                Some(path) => write!(
                    f,
                    "\n  - {} ({}): {}",
                    attempt.kind.label(),
                    path.display(),
                    attempt.reason
                )?,
                None => write!(f, "\n  - {}: {}", attempt.kind.label(), attempt.reason)?,
            }
        }
        write!(
            f,
            "\nInstall Google Chrome, Chromium, Microsoft Edge or Brave, or run in static mode."
        )
    }
}

impl std::error::Error for BrowserUnavailable {}

/// Starts a session using the first binding that works.
///
/// The first binding is the primary and is always tried, with its
/// discovered executable if there is one. The remaining bindings are tried
/// in discovery order, and only for browsers that were discovered.
///
/// # Errors
///
/// Returns [`BrowserUnavailable`] listing every attempt if none succeeds.
pub fn start_session(
    discovery: &dyn BrowserDiscovery,
    bindings: &[Box<dyn BrowserBinding>],
    user_agent: &str,
) -> Result<(BrowserKind, Box<dyn BrowserSession>), BrowserUnavailable> {
    let discovered = discovery.discover();
    log::debug!(
        "Discovered browsers: {:?}",
        discovered.iter().map(|b| b.kind).collect::<Vec<_>>()
    );

    let mut attempts = Vec::new();
    let mut try_launch = |binding: &dyn BrowserBinding, path: Option<&Path>| {
        log::debug!("Launching {} ({path:?})", binding.kind().label());
        match binding.launch(path, user_agent) {
            Ok(session) => Some(session),
            Err(reason) => {
                log::warn!("{} failed to start: {reason}", binding.kind().label());
                attempts.push(LaunchAttempt {
                    kind: binding.kind(),
                    path: path.map(Path::to_path_buf),
                    reason,
                });
                None
            }
        }
    };

    if let Some((primary, secondaries)) = bindings.split_first() {
        let path = discovered
            .iter()
            .find(|b| b.kind == primary.kind())
            .map(|b| b.path.as_path());
        if let Some(session) = try_launch(primary.as_ref(), path) {
            return Ok((primary.kind(), session));
        }

        for browser in discovered.iter().filter(|b| b.kind != primary.kind()) {
            let Some(binding) = secondaries.iter().find(|b| b.kind() == browser.kind) else {
                continue;
            };
            if let Some(session) = try_launch(binding.as_ref(), Some(&browser.path)) {
                log::info!("Falling back to {}", browser.kind.label());
                return Ok((browser.kind, session));
            }
        }
    }

    Err(BrowserUnavailable {
        discovered,
        attempts,
    })
}

/// One binding per supported browser, Chrome first.
#[must_use]
pub fn default_bindings() -> Vec<Box<dyn BrowserBinding>> {
    BrowserKind::ALL
        .iter()
        .map(|kind| Box::new(CdpBinding::new(*kind)) as Box<dyn BrowserBinding>)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    pub struct FakeDiscovery(pub Vec<DiscoveredBrowser>);

    impl BrowserDiscovery for FakeDiscovery {
        fn discover(&self) -> Vec<DiscoveredBrowser> {
            self.0.clone()
        }
    }

    pub struct FakeSession {
        html: String,
        closed: Arc<AtomicBool>,
    }

    impl BrowserSession for FakeSession {
        fn render(&mut self, _url: &str, _settle: Duration) -> Result<String, String> {
            Ok(self.html.clone())
        }
    }

    impl Drop for FakeSession {
        fn drop(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    pub struct FakeBinding {
        pub kind: BrowserKind,
        pub html: Option<&'static str>,
        pub launches: Arc<AtomicUsize>,
        pub closed: Arc<AtomicBool>,
    }

    impl FakeBinding {
        pub fn working(kind: BrowserKind, html: &'static str) -> Self {
            Self {
                kind,
                html: Some(html),
                launches: Arc::default(),
                closed: Arc::default(),
            }
        }

        pub fn broken(kind: BrowserKind) -> Self {
            Self {
                kind,
                html: None,
                launches: Arc::default(),
                closed: Arc::default(),
            }
        }
    }

    impl BrowserBinding for FakeBinding {
        fn kind(&self) -> BrowserKind {
            self.kind
        }

        fn launch(
            &self,
            _executable: Option<&Path>,
            _user_agent: &str,
        ) -> Result<Box<dyn BrowserSession>, String> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            self.html.map_or_else(
                || Err(format!("{} driver missing", self.kind)),
                |html| {
                    Ok(Box::new(FakeSession {
                        html: html.to_owned(),
                        closed: Arc::clone(&self.closed),
                    }) as Box<dyn BrowserSession>)
                },
            )
        }
    }

    pub fn found(kind: BrowserKind) -> DiscoveredBrowser {
        DiscoveredBrowser {
            kind,
            path: PathBuf::from(format!("/opt/{kind}/bin")),
        }
    }

    #[test]
    fn primary_binding_is_preferred() {
        let discovery = FakeDiscovery(vec![found(BrowserKind::Chrome), found(BrowserKind::Edge)]);
        let edge = FakeBinding::working(BrowserKind::Edge, "edge");
        let edge_launches = Arc::clone(&edge.launches);
        let bindings: Vec<Box<dyn BrowserBinding>> = vec![
            Box::new(FakeBinding::working(BrowserKind::Chrome, "chrome")),
            Box::new(edge),
        ];

        let (kind, _session) = start_session(&discovery, &bindings, "ua").unwrap();

        assert_eq!(kind, BrowserKind::Chrome);
        assert_eq!(edge_launches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn falls_back_to_discovered_secondary() {
        let discovery = FakeDiscovery(vec![found(BrowserKind::Edge)]);
        let bindings: Vec<Box<dyn BrowserBinding>> = vec![
            Box::new(FakeBinding::broken(BrowserKind::Chrome)),
            Box::new(FakeBinding::working(BrowserKind::Edge, "<p>edge</p>")),
        ];

        let (kind, mut session) = start_session(&discovery, &bindings, "ua").unwrap();

        assert_eq!(kind, BrowserKind::Edge);
        assert_eq!(
            session.render("http://x", Duration::ZERO).unwrap(),
            "<p>edge</p>"
        );
    }

    #[test]
    fn undiscovered_secondary_is_not_tried() {
        let discovery = FakeDiscovery(vec![]);
        let brave = FakeBinding::working(BrowserKind::Brave, "brave");
        let brave_launches = Arc::clone(&brave.launches);
        let bindings: Vec<Box<dyn BrowserBinding>> = vec![
            Box::new(FakeBinding::broken(BrowserKind::Chrome)),
            Box::new(brave),
        ];

        let err = start_session(&discovery, &bindings, "ua").err().unwrap();

        assert_eq!(brave_launches.load(Ordering::SeqCst), 0);
        assert_eq!(err.attempts.len(), 1);
        assert!(err.to_string().contains("No supported browser was found"));
    }

    #[test]
    fn aggregated_error_names_every_attempt() {
        let discovery = FakeDiscovery(vec![found(BrowserKind::Chrome), found(BrowserKind::Edge)]);
        let bindings: Vec<Box<dyn BrowserBinding>> = vec![
            Box::new(FakeBinding::broken(BrowserKind::Chrome)),
            Box::new(FakeBinding::broken(BrowserKind::Edge)),
        ];

        let err = start_session(&discovery, &bindings, "ua").err().unwrap();
        let message = err.to_string();

        assert_eq!(
            err.attempts.iter().map(|a| a.kind).collect::<Vec<_>>(),
            [BrowserKind::Chrome, BrowserKind::Edge]
        );
        assert!(message.contains("Google Chrome (/opt/chrome/bin): chrome driver missing"));
        assert!(message.contains("Microsoft Edge (/opt/edge/bin): edge driver missing"));
        assert!(message.contains("run in static mode"));
    }

    #[test]
    fn default_bindings_put_chrome_first() {
        let kinds: Vec<BrowserKind> = default_bindings().iter().map(|b| b.kind()).collect();
        assert_eq!(kinds, BrowserKind::ALL);
    }
}

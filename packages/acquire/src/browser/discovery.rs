//! Probes the local system for installed browsers.

use std::ffi::OsString;
use std::path::PathBuf;

use super::{BrowserDiscovery, BrowserKind, DiscoveredBrowser};

/// Looks for each candidate browser at its well-known install locations,
/// then on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemDiscovery {
    candidates: Vec<BrowserKind>,
    locations: Vec<(BrowserKind, PathBuf)>,
    search_path: Option<OsString>,
}

impl Default for SystemDiscovery {
    fn default() -> Self {
        Self {
            candidates: BrowserKind::ALL.to_vec(),
            locations: install_locations(),
            search_path: std::env::var_os("PATH"),
        }
    }
}

impl SystemDiscovery {
    /// Discovery with explicit candidates, fixed locations, and search path.
    #[must_use]
    pub const fn new(
        candidates: Vec<BrowserKind>,
        locations: Vec<(BrowserKind, PathBuf)>,
        search_path: Option<OsString>,
    ) -> Self {
        Self {
            candidates,
            locations,
            search_path,
        }
    }

    fn find(&self, kind: BrowserKind) -> Option<PathBuf> {
        if let Some((_, path)) = self
            .locations
            .iter()
            .find(|(k, path)| *k == kind && path.is_file())
        {
            return Some(path.clone());
        }

        let search_path = self.search_path.as_ref()?;
        executable_names(kind).iter().find_map(|name| {
            std::env::split_paths(search_path)
                .map(|dir| dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX)))
                .find(|candidate| candidate.is_file())
        })
    }
}

impl BrowserDiscovery for SystemDiscovery {
    fn discover(&self) -> Vec<DiscoveredBrowser> {
        self.candidates
            .iter()
            .filter_map(|kind| {
                self.find(*kind).map(|path| DiscoveredBrowser { kind: *kind, path })
            })
            .collect()
    }
}

/// Executable names searched for on `PATH`.
const fn executable_names(kind: BrowserKind) -> &'static [&'static str] {
    match kind {
        BrowserKind::Chrome => &["google-chrome", "google-chrome-stable", "chrome"],
        BrowserKind::Chromium => &["chromium", "chromium-browser"],
        BrowserKind::Edge => &["microsoft-edge", "microsoft-edge-stable", "msedge"],
        BrowserKind::Brave => &["brave-browser", "brave"],
    }
}

#[cfg(target_os = "windows")]
fn install_locations() -> Vec<(BrowserKind, PathBuf)> {
    [
        (
            BrowserKind::Chrome,
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        ),
        (
            BrowserKind::Chrome,
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ),
        (
            BrowserKind::Chromium,
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ),
        (
            BrowserKind::Edge,
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ),
        (
            BrowserKind::Edge,
            r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
        ),
        (
            BrowserKind::Brave,
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
        ),
    ]
    .into_iter()
    .map(|(kind, path)| (kind, PathBuf::from(path)))
    .collect()
}

#[cfg(target_os = "macos")]
fn install_locations() -> Vec<(BrowserKind, PathBuf)> {
    [
        (
            BrowserKind::Chrome,
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ),
        (
            BrowserKind::Chromium,
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ),
        (
            BrowserKind::Edge,
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ),
        (
            BrowserKind::Brave,
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ),
    ]
    .into_iter()
    .map(|(kind, path)| (kind, PathBuf::from(path)))
    .collect()
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn install_locations() -> Vec<(BrowserKind, PathBuf)> {
    [
        (BrowserKind::Chrome, "/usr/bin/google-chrome"),
        (BrowserKind::Chrome, "/usr/bin/google-chrome-stable"),
        (BrowserKind::Chrome, "/opt/google/chrome/chrome"),
        (BrowserKind::Chromium, "/usr/bin/chromium"),
        (BrowserKind::Chromium, "/usr/bin/chromium-browser"),
        (BrowserKind::Chromium, "/snap/bin/chromium"),
        (BrowserKind::Edge, "/usr/bin/microsoft-edge"),
        (BrowserKind::Edge, "/opt/microsoft/msedge/msedge"),
        (BrowserKind::Brave, "/usr/bin/brave-browser"),
        (BrowserKind::Brave, "/opt/brave.com/brave/brave"),
    ]
    .into_iter()
    .map(|(kind, path)| (kind, PathBuf::from(path)))
    .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn finds_browsers_on_search_path_in_candidate_order() {
        let dir = tempfile::tempdir().unwrap();
        let brave = touch(dir.path(), "brave");
        let chromium = touch(dir.path(), "chromium-browser");

        let discovery = SystemDiscovery::new(
            BrowserKind::ALL.to_vec(),
            vec![],
            Some(dir.path().as_os_str().to_owned()),
        );

        assert_eq!(
            discovery.discover(),
            [
                DiscoveredBrowser {
                    kind: BrowserKind::Chromium,
                    path: chromium
                },
                DiscoveredBrowser {
                    kind: BrowserKind::Brave,
                    path: brave
                },
            ]
        );
    }

    #[test]
    fn fixed_locations_win_over_search_path() {
        let fixed = tempfile::tempdir().unwrap();
        let on_path = tempfile::tempdir().unwrap();
        let installed = touch(fixed.path(), "edge-install");
        touch(on_path.path(), "msedge");

        let discovery = SystemDiscovery::new(
            vec![BrowserKind::Edge],
            vec![(BrowserKind::Edge, installed.clone())],
            Some(on_path.path().as_os_str().to_owned()),
        );

        assert_eq!(discovery.discover()[0].path, installed);
    }

    #[test]
    fn missing_locations_are_skipped() {
        let discovery = SystemDiscovery::new(
            vec![BrowserKind::Chrome],
            vec![(BrowserKind::Chrome, PathBuf::from("/definitely/not/here"))],
            None,
        );

        assert!(discovery.discover().is_empty());
    }
}

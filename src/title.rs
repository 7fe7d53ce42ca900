//! Stable window identity derived from volatile window titles.
//!
//! Browsers put the current tab in front of the window title and IDEs put
//! the current file there, so the raw title changes every time the user
//! switches tabs or files.  [`TitleRules`] strips the volatile part and keeps
//! the piece that identifies the *window*: the browser profile name, or the
//! IDE project name.
//!
//! The per-application knowledge is data, not code: browsers are described
//! by a list of [`BrowserFamily`] entries mapping bundle identifiers to
//! separator tokens, and IDEs by a list of bundle-identifier prefixes.  Both
//! can be extended from the `titles` section of the config file.
//!
//! ```json
//! {
//!   "titles": {
//!     "browsers": [
//!       { "bundles": ["com.vivaldi.Vivaldi"], "separators": [" - Vivaldi - "] }
//!     ],
//!     "ide_prefixes": ["com.jetbrains."]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Separator between project name and current file in IDE titles.
const EN_DASH: char = '\u{2013}';

/// Joins the stable name and the volatile context in [`TitleRules::display_name`].
const DISPLAY_JOIN: &str = " \u{b7} ";

/// A group of browsers that share the `"<tab> - <Browser> - <profile>"`
/// title convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserFamily {
    /// Bundle identifiers belonging to this family.
    pub bundles: Vec<String>,
    /// Separator tokens, tried in order.  Each one is searched from the end
    /// of the title.
    pub separators: Vec<String>,
}

/// Per-application title heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleRules {
    /// Browser families whose profile name is the stable identity.
    pub browsers: Vec<BrowserFamily>,
    /// Bundle-identifier prefixes of multi-window IDEs whose project name is
    /// the stable identity.
    pub ide_prefixes: Vec<String>,
}

impl Default for TitleRules {
    fn default() -> Self {
        let family = |bundles: &[&str], separators: &[&str]| BrowserFamily {
            bundles: bundles.iter().map(|s| s.to_string()).collect(),
            separators: separators.iter().map(|s| s.to_string()).collect(),
        };
        Self {
            browsers: vec![
                family(
                    &["com.google.Chrome", "com.google.Chrome.canary", "google-chrome"],
                    &[" - Google Chrome - ", " - Chrome - "],
                ),
                family(&["com.brave.Browser", "brave-browser"], &[" - Brave - "]),
                family(
                    &["com.microsoft.edgemac", "microsoft-edge"],
                    &[" - Microsoft Edge - ", " - Edge - "],
                ),
            ],
            ide_prefixes: vec!["com.jetbrains.".into(), "jetbrains-".into()],
        }
    }
}

impl TitleRules {
    /// Derive the stable identity name of a window.
    ///
    /// First match wins: browser profile, then IDE project, then the raw
    /// title verbatim.  Total over all inputs; a title that does not follow
    /// the expected convention comes back unchanged.
    pub fn extract_stable_name(&self, bundle_identifier: &str, title: &str) -> String {
        if let Some((_, profile)) = self.split_browser_title(bundle_identifier, title) {
            return profile.to_string();
        }
        if self.is_ide(bundle_identifier) {
            return extract_project_name(title);
        }
        title.to_string()
    }

    /// Human-readable label: `"<stable> · <current tab or file>"` when the
    /// title carries volatile context, otherwise the raw title.
    pub fn display_name(&self, bundle_identifier: &str, title: &str) -> String {
        let stable = self.extract_stable_name(bundle_identifier, title);
        if stable == title || title.is_empty() {
            return title.to_string();
        }
        if let Some((tab, _)) = self.split_browser_title(bundle_identifier, title) {
            return format!("{}{}{}", stable, DISPLAY_JOIN, tab);
        }
        if self.is_ide(bundle_identifier) {
            if let Some((_, file)) = title.split_once(EN_DASH) {
                return format!("{}{}{}", stable, DISPLAY_JOIN, file.trim());
            }
        }
        title.to_string()
    }

    /// Whether `bundle_identifier` belongs to a configured IDE family.
    pub fn is_ide(&self, bundle_identifier: &str) -> bool {
        self.ide_prefixes
            .iter()
            .any(|p| !p.is_empty() && bundle_identifier.starts_with(p.as_str()))
    }

    fn browser_separators(&self, bundle_identifier: &str) -> Option<&[String]> {
        self.browsers
            .iter()
            .find(|f| f.bundles.iter().any(|b| b == bundle_identifier))
            .map(|f| f.separators.as_slice())
    }

    /// Split a browser title into `(tab, profile)` around the last
    /// occurrence of the first separator that is present.
    fn split_browser_title<'t>(
        &self,
        bundle_identifier: &str,
        title: &'t str,
    ) -> Option<(&'t str, &'t str)> {
        let separators = self.browser_separators(bundle_identifier)?;
        separators
            .iter()
            .filter(|sep| !sep.is_empty())
            .find_map(|sep| {
                title
                    .rfind(sep.as_str())
                    .map(|pos| (&title[..pos], &title[pos + sep.len()..]))
            })
    }
}

/// Extract the project name from an IDE title such as
/// `"MyProj [main] – Main.kt"` or `"MyProj – Main.kt [app]"`.
///
/// The project is the segment before the first en-dash with any bracketed
/// annotation removed.  Titles without an en-dash are returned unchanged.
pub fn extract_project_name(title: &str) -> String {
    let Some((project, _)) = title.split_once(EN_DASH) else {
        return title.to_string();
    };
    let project = match project.find('[') {
        Some(bracket) => &project[..bracket],
        None => project,
    };
    project.trim().to_string()
}

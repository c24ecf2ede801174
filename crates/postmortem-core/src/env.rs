//! Environment overrides, read once per process.
//!
//! Nothing here may go through [`crate::session::CrashSession`]: hosts need the
//! bug tracker URL while they are still building the session.

use std::sync::OnceLock;

pub const BUGZILLA_URL_VAR: &str = "DRKONQI_KDE_BUGZILLA_URL";
pub const TEST_MODE_VAR: &str = "DRKONQI_TEST_MODE";
pub const IGNORE_QUALITY_VAR: &str = "DRKONQI_IGNORE_QUALITY";

pub const PRODUCTION_BUGZILLA_URL: &str = "https://bugs.kde.org/";
pub const TEST_BUGZILLA_URL: &str = "https://bugstest.kde.org/";

/// Whether backtrace quality gating should be relaxed.
pub fn ignore_quality() -> bool {
    static IGNORE: OnceLock<bool> = OnceLock::new();
    *IGNORE.get_or_init(|| resolve_ignore_quality(process_env))
}

/// Base URL of the bug tracker reports are filed against.
pub fn bugzilla_base_url() -> &'static str {
    static URL: OnceLock<String> = OnceLock::new();
    URL.get_or_init(|| resolve_bugzilla_url(process_env))
}

fn process_env(name: &str) -> Option<String> {
    std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
}

/// A variable counts as set even when it is empty.
pub fn resolve_ignore_quality(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup(IGNORE_QUALITY_VAR).is_some() || lookup(TEST_MODE_VAR).is_some()
}

/// An explicit, non-empty override wins over test mode.
pub fn resolve_bugzilla_url(lookup: impl Fn(&str) -> Option<String>) -> String {
    if let Some(url) = lookup(BUGZILLA_URL_VAR).filter(|url| !url.is_empty()) {
        return url;
    }

    if lookup(TEST_MODE_VAR).is_some() {
        TEST_BUGZILLA_URL.to_string()
    } else {
        PRODUCTION_BUGZILLA_URL.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_production_url_by_default() {
        assert_eq!(resolve_bugzilla_url(env(&[])), PRODUCTION_BUGZILLA_URL);
    }

    #[test]
    fn test_test_mode_url() {
        assert_eq!(
            resolve_bugzilla_url(env(&[(TEST_MODE_VAR, "1")])),
            TEST_BUGZILLA_URL
        );
        // Set-but-empty still selects test mode.
        assert_eq!(
            resolve_bugzilla_url(env(&[(TEST_MODE_VAR, "")])),
            TEST_BUGZILLA_URL
        );
    }

    #[test]
    fn test_override_beats_test_mode() {
        let lookup = env(&[
            (TEST_MODE_VAR, "1"),
            (BUGZILLA_URL_VAR, "http://localhost:8080/"),
        ]);
        assert_eq!(resolve_bugzilla_url(lookup), "http://localhost:8080/");
    }

    #[test]
    fn test_empty_override_is_ignored() {
        assert_eq!(
            resolve_bugzilla_url(env(&[(BUGZILLA_URL_VAR, "")])),
            PRODUCTION_BUGZILLA_URL
        );
    }

    #[test]
    fn test_ignore_quality() {
        assert!(!resolve_ignore_quality(env(&[])));
        assert!(resolve_ignore_quality(env(&[(IGNORE_QUALITY_VAR, "")])));
        assert!(resolve_ignore_quality(env(&[(TEST_MODE_VAR, "1")])));
    }

    #[test]
    fn test_cached_url_is_stable() {
        let first = bugzilla_base_url();
        let second = bugzilla_base_url();
        assert!(std::ptr::eq(first, second));
    }
}

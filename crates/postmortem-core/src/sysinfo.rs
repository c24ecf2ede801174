use serde::Serialize;
use std::fs;

const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];
const KERNEL_RELEASE_PATH: &str = "/proc/sys/kernel/osrelease";

/// Snapshot of the host system, attached to every report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemInformation {
    pub os: String,
    pub arch: String,
    pub kernel_release: Option<String>,
    pub distribution: Option<String>,
}

impl SystemInformation {
    /// Never fails; unreadable sources leave their field empty.
    pub fn collect() -> Self {
        let distribution = OS_RELEASE_PATHS
            .iter()
            .find_map(|path| fs::read_to_string(path).ok())
            .and_then(|content| pretty_name(&content));

        let kernel_release = fs::read_to_string(KERNEL_RELEASE_PATH)
            .ok()
            .map(|release| release.trim().to_string())
            .filter(|release| !release.is_empty());

        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            kernel_release,
            distribution,
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = format!("Operating System: {} ({})", self.os, self.arch);
        if let Some(kernel) = &self.kernel_release {
            summary.push_str(&format!(" release {}", kernel));
        }
        if let Some(distribution) = &self.distribution {
            summary.push_str(&format!("\nDistribution: {}", distribution));
        }
        summary
    }
}

/// `PRETTY_NAME` from os-release content, unquoted.
pub fn pretty_name(os_release: &str) -> Option<String> {
    os_release
        .lines()
        .filter_map(|line| line.trim().strip_prefix("PRETTY_NAME="))
        .map(|value| value.trim_matches(|c| c == '"' || c == '\'').to_string())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_name() {
        let content = "NAME=\"Fedora Linux\"\nVERSION_ID=39\nPRETTY_NAME=\"Fedora Linux 39 (KDE Plasma)\"\n";
        assert_eq!(
            pretty_name(content).as_deref(),
            Some("Fedora Linux 39 (KDE Plasma)")
        );
    }

    #[test]
    fn test_pretty_name_missing() {
        assert_eq!(pretty_name("NAME=Arch\nPRETTY_NAME=\n"), None);
    }

    #[test]
    fn test_collect_fills_platform() {
        let info = SystemInformation::collect();
        assert_eq!(info.os, std::env::consts::OS);
        assert!(info.summary().starts_with("Operating System: "));
    }
}

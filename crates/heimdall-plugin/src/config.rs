//! Plugin configuration.
//!
//! Every setter is forgiving: an unknown format or version string falls
//! back to a documented default with a warning instead of failing the
//! link.

use heimdall_cyclonedx::CycloneDxVersion;
use heimdall_spdx::SpdxVersion;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Output format family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatFamily {
    #[default]
    Spdx,
    CycloneDx,
}

/// Process-wide plugin configuration, mutated by the `heimdall_set_*`
/// entry points.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub output_path: PathBuf,
    pub format: FormatFamily,
    pub spdx_version: SpdxVersion,
    pub cyclonedx_version: CycloneDxVersion,
    pub verbose: bool,
    /// Directory scanned for compiler sidecar files; `None` selects the
    /// per-process default under the temp directory.
    pub sidecar_dir: Option<PathBuf>,
    /// Delete sidecar files after a successful emit.
    pub cleanup_sidecars: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("heimdall-sbom.json"),
            format: FormatFamily::Spdx,
            spdx_version: SpdxVersion::V2_3,
            cyclonedx_version: CycloneDxVersion::V1_6,
            verbose: false,
            sidecar_dir: None,
            cleanup_sidecars: false,
        }
    }
}

impl PluginConfig {
    /// Applies a format selector: a bare family (`spdx`, `cyclonedx`) or a
    /// family with a pinned version (`spdx-3.0.1`, `cyclonedx-1.4`).
    /// Unknown selectors fall back to SPDX 2.3.
    pub fn set_format(&mut self, selector: &str) {
        match selector.trim().to_lowercase().as_str() {
            "spdx" => self.format = FormatFamily::Spdx,
            "spdx-2.3" => {
                self.format = FormatFamily::Spdx;
                self.spdx_version = SpdxVersion::V2_3;
            }
            "spdx-3.0" | "spdx-3.0.0" => {
                self.format = FormatFamily::Spdx;
                self.spdx_version = SpdxVersion::V3_0_0;
            }
            "spdx-3.0.1" => {
                self.format = FormatFamily::Spdx;
                self.spdx_version = SpdxVersion::V3_0_1;
            }
            "cyclonedx" => self.format = FormatFamily::CycloneDx,
            "cyclonedx-1.4" => {
                self.format = FormatFamily::CycloneDx;
                self.cyclonedx_version = CycloneDxVersion::V1_4;
            }
            "cyclonedx-1.6" => {
                self.format = FormatFamily::CycloneDx;
                self.cyclonedx_version = CycloneDxVersion::V1_6;
            }
            other => {
                warn!(format = other, "unsupported SBOM format, falling back to spdx-2.3");
                self.format = FormatFamily::Spdx;
                self.spdx_version = SpdxVersion::V2_3;
            }
        }
    }

    pub fn set_spdx_version(&mut self, version: &str) {
        match SpdxVersion::parse(version) {
            Some(parsed) => self.spdx_version = parsed,
            None => {
                warn!(version, "unsupported SPDX version, falling back to 2.3");
                self.spdx_version = SpdxVersion::V2_3;
            }
        }
    }

    pub fn set_cyclonedx_version(&mut self, version: &str) {
        match CycloneDxVersion::parse(version) {
            Some(parsed) => self.cyclonedx_version = parsed,
            None => {
                warn!(version, "unsupported CycloneDX version, falling back to 1.6");
                self.cyclonedx_version = CycloneDxVersion::V1_6;
            }
        }
    }

    /// The sidecar directory to scan: the configured one, or
    /// `heimdall-metadata-<pid>` under the temp directory.
    pub fn sidecar_directory(&self) -> PathBuf {
        self.sidecar_dir
            .clone()
            .unwrap_or_else(default_sidecar_directory)
    }
}

/// `TMPDIR`/`TMP`/`TEMP` are consulted in order; `/tmp` is the fallback.
pub fn default_sidecar_directory() -> PathBuf {
    let base = ["TMPDIR", "TMP", "TEMP"]
        .iter()
        .find_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new("/tmp").to_path_buf());
    base.join(format!("heimdall-metadata-{}", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PluginConfig::default();
        assert_eq!(config.format, FormatFamily::Spdx);
        assert_eq!(config.spdx_version, SpdxVersion::V2_3);
        assert_eq!(config.cyclonedx_version, CycloneDxVersion::V1_6);
        assert_eq!(config.output_path, PathBuf::from("heimdall-sbom.json"));
    }

    #[test]
    fn test_format_selectors() {
        let mut config = PluginConfig::default();

        config.set_format("cyclonedx-1.4");
        assert_eq!(config.format, FormatFamily::CycloneDx);
        assert_eq!(config.cyclonedx_version, CycloneDxVersion::V1_4);

        config.set_format("spdx-3.0.1");
        assert_eq!(config.format, FormatFamily::Spdx);
        assert_eq!(config.spdx_version, SpdxVersion::V3_0_1);

        config.set_format("SPDX");
        assert_eq!(config.format, FormatFamily::Spdx);
        // Bare family keeps the previously selected version.
        assert_eq!(config.spdx_version, SpdxVersion::V3_0_1);
    }

    #[test]
    fn test_unknown_format_falls_back_to_spdx_2_3() {
        let mut config = PluginConfig::default();
        config.set_format("spdx-3.0.1");
        config.set_format("tag-soup");
        assert_eq!(config.format, FormatFamily::Spdx);
        assert_eq!(config.spdx_version, SpdxVersion::V2_3);
    }

    #[test]
    fn test_unknown_versions_fall_back() {
        let mut config = PluginConfig::default();
        config.set_spdx_version("9.9");
        assert_eq!(config.spdx_version, SpdxVersion::V2_3);
        config.set_cyclonedx_version("0.9");
        assert_eq!(config.cyclonedx_version, CycloneDxVersion::V1_6);
    }

    #[test]
    fn test_default_sidecar_directory_is_per_process() {
        let dir = default_sidecar_directory();
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("heimdall-metadata-{}", std::process::id()));
    }
}

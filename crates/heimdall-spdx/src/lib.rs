#![doc = include_str!("../readme.md")]

use heimdall_model::{BuildInfo, ComponentStore};
use std::io::Write;
use thiserror::Error;

mod ids;
mod jsonld;
mod tag_value;

pub use ids::spdx_ref;

/// Errors that can occur while writing an SPDX document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Supported SPDX specification versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpdxVersion {
    #[default]
    V2_3,
    V3_0_0,
    V3_0_1,
}

impl SpdxVersion {
    /// Parses a user-supplied version string. `None` for anything the core
    /// does not support; callers decide the fallback.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "2.3" => Some(SpdxVersion::V2_3),
            "3.0" | "3.0.0" => Some(SpdxVersion::V3_0_0),
            "3.0.1" => Some(SpdxVersion::V3_0_1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpdxVersion::V2_3 => "2.3",
            SpdxVersion::V3_0_0 => "3.0.0",
            SpdxVersion::V3_0_1 => "3.0.1",
        }
    }
}

/// Document-level facts shared by every SPDX rendering.
#[derive(Debug, Clone, Default)]
pub struct SpdxDocumentInfo {
    /// ISO-8601 UTC creation time, second precision, `Z` suffix.
    pub created: String,
    pub tool_version: String,
    pub build_info: BuildInfo,
    /// SPDX 2.3 package verification code, precomputed by the caller.
    pub verification_code: String,
}

impl SpdxDocumentInfo {
    pub fn new(
        tool_version: impl Into<String>,
        build_info: BuildInfo,
        verification_code: impl Into<String>,
    ) -> Self {
        Self {
            created: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            tool_version: tool_version.into(),
            build_info,
            verification_code: verification_code.into(),
        }
    }

    pub fn document_name(&self) -> &str {
        if self.build_info.target_name.is_empty() {
            "Heimdall Generated SBOM"
        } else {
            &self.build_info.target_name
        }
    }

    pub fn namespace(&self) -> String {
        format!("https://spdx.org/spdxdocs/heimdall-{}", self.created)
    }

    pub fn creator(&self) -> String {
        format!("Heimdall SBOM Generator-{}", self.tool_version)
    }
}

/// Renders a component store in the selected SPDX version.
#[derive(Debug, Clone)]
pub struct SpdxWriter {
    pub version: SpdxVersion,
    pub info: SpdxDocumentInfo,
}

impl SpdxWriter {
    pub fn new(version: SpdxVersion, info: SpdxDocumentInfo) -> Self {
        Self { version, info }
    }

    /// Writes one complete document. Components appear in store insertion
    /// order.
    pub fn write<W: Write>(&self, store: &ComponentStore, writer: &mut W) -> Result<(), Error> {
        match self.version {
            SpdxVersion::V2_3 => tag_value::write(store, &self.info, writer),
            SpdxVersion::V3_0_0 | SpdxVersion::V3_0_1 => {
                jsonld::write(store, &self.info, self.version, writer)
            }
        }
    }
}

/// Substitutes `NOASSERTION` for values the detection layers left empty and
/// for anything that is not a registered SPDX identifier.
pub(crate) fn license_or_noassertion(license: &str) -> &str {
    if license.is_empty() || license == "UNKNOWN" || spdx::license_id(license).is_none() {
        "NOASSERTION"
    } else {
        license
    }
}

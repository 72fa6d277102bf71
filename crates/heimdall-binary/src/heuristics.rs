//! Best-effort license and version heuristics.
//!
//! Three license probes run in order — file content, path fragments, symbol
//! prefixes — and the first hit wins. Results are normalised onto a fixed
//! set of SPDX short identifiers; anything unrecognised becomes
//! `NOASSERTION`. Nothing in this module is fatal.

use heimdall_model::SymbolInfo;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Identifiers the normaliser may produce.
pub const ALLOWED_LICENSES: [&str; 7] = [
    "MIT",
    "Apache-2.0",
    "GPL-3.0-only",
    "GPL-2.0-only",
    "LGPL-3.0-only",
    "LGPL-2.1-only",
    "BSD-3-Clause",
];

pub const NOASSERTION: &str = "NOASSERTION";

const CONTENT_PROBE_LINES: usize = 50;

/// Declarative probe tables. The defaults cover common system libraries;
/// tests and callers can extend them without code changes.
#[derive(Debug, Clone)]
pub struct HeuristicTables {
    /// Path fragment -> SPDX id.
    pub path_licenses: Vec<(String, String)>,
    /// Distinctive symbol-name prefix -> SPDX id.
    pub symbol_licenses: Vec<(String, String)>,
}

impl Default for HeuristicTables {
    fn default() -> Self {
        let own = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        Self {
            path_licenses: own(&[
                ("libssl", "Apache-2.0"),
                ("libcrypto", "Apache-2.0"),
                ("openssl", "Apache-2.0"),
                ("libstdc++", "GPL-3.0-only"),
                ("libgcc", "GPL-3.0-only"),
                ("libc.so", "LGPL-2.1-only"),
                ("glibc", "LGPL-2.1-only"),
                ("libbz2", "BSD-3-Clause"),
                ("libcurl", "MIT"),
                ("libexpat", "MIT"),
            ]),
            symbol_licenses: own(&[
                ("SSL_", "Apache-2.0"),
                ("EVP_", "Apache-2.0"),
                ("BZ2_", "BSD-3-Clause"),
                ("curl_", "MIT"),
                ("XML_", "MIT"),
                ("_ZSt", "GPL-3.0-only"),
            ]),
        }
    }
}

/// Runs the three license probes in order and normalises the winner.
pub fn detect_license(path: &Path, symbols: &[SymbolInfo], tables: &HeuristicTables) -> String {
    if let Some(raw) = detect_license_from_content(path) {
        let id = normalize_spdx(&raw);
        if id != NOASSERTION {
            return id;
        }
    }
    if let Some(id) = detect_license_from_path(path, tables) {
        return id;
    }
    if let Some(id) = detect_license_from_symbols(symbols, tables) {
        return id;
    }
    NOASSERTION.to_string()
}

/// Scans the first 50 lines of `path` for license evidence: an SPDX tag, a
/// recognisable license name, or a copyright/author marker line.
pub fn detect_license_from_content(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let reader = BufReader::new(file);

    let mut marker_line: Option<String> = None;
    for line in reader.lines().take(CONTENT_PROBE_LINES) {
        let Ok(line) = line else { break };
        if let Some(rest) = line.split("SPDX-License-Identifier:").nth(1) {
            return Some(rest.trim().to_string());
        }
        if marker_line.is_none() {
            let lower = line.to_lowercase();
            let marked = lower.contains("copyright")
                || lower.contains("(c)")
                || line.contains('©')
                || lower.contains("@author")
                || lower.contains("license");
            if marked && normalize_spdx(&line) != NOASSERTION {
                marker_line = Some(line);
            }
        }
    }
    marker_line
}

pub fn detect_license_from_path(path: &Path, tables: &HeuristicTables) -> Option<String> {
    let path = path.to_string_lossy().to_lowercase();
    tables
        .path_licenses
        .iter()
        .find(|(fragment, _)| path.contains(&fragment.to_lowercase()))
        .map(|(_, id)| id.clone())
}

pub fn detect_license_from_symbols(
    symbols: &[SymbolInfo],
    tables: &HeuristicTables,
) -> Option<String> {
    for symbol in symbols {
        for (prefix, id) in &tables.symbol_licenses {
            if symbol.name.starts_with(prefix.as_str()) {
                return Some(id.clone());
            }
        }
    }
    None
}

static MIT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bMIT\b").unwrap());

/// Normalises free-form license evidence onto the fixed identifier set.
pub fn normalize_spdx(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "UNKNOWN" {
        return NOASSERTION.to_string();
    }
    // Exact SPDX short identifiers pass through untouched.
    if ALLOWED_LICENSES.contains(&trimmed) && spdx::license_id(trimmed).is_some() {
        return trimmed.to_string();
    }

    let upper = trimmed.to_uppercase();
    if upper.contains("APACHE") {
        "Apache-2.0"
    } else if upper.contains("LGPL") {
        if upper.contains('3') {
            "LGPL-3.0-only"
        } else {
            "LGPL-2.1-only"
        }
    } else if upper.contains("GPL") {
        if upper.contains('3') {
            "GPL-3.0-only"
        } else {
            "GPL-2.0-only"
        }
    } else if upper.contains("BSD") {
        "BSD-3-Clause"
    } else if MIT_WORD.is_match(&upper) {
        "MIT"
    } else {
        NOASSERTION
    }
    .to_string()
}

static SO_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.so\.([0-9]+(?:\.[0-9]+)*)$").unwrap());
static NAME_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_]([0-9]+(?:\.[0-9]+)+)\.(?:so|dylib|dll|a)$").unwrap());
static PATH_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|/)[A-Za-z0-9_.+]+-([0-9]+(?:\.[0-9]+)+)(?:/|$)").unwrap());
static SYMBOL_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+[A-Za-z_]*_([0-9]+(?:\.[0-9]+)+)$").unwrap());

/// Version detection across file name, path segments, and symbol names, in
/// that order.
pub fn detect_version(path: &Path, symbols: &[SymbolInfo]) -> Option<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    detect_version_from_filename(&name)
        .or_else(|| detect_version_from_path(path))
        .or_else(|| detect_version_from_symbols(symbols))
}

/// `libfoo.so.1.2.3`, `libfoo-1.2.3.so`, `foo-1.2.3.dll` style names.
pub fn detect_version_from_filename(name: &str) -> Option<String> {
    SO_VERSION
        .captures(name)
        .or_else(|| NAME_VERSION.captures(name))
        .map(|c| c[1].to_string())
}

/// `/usr/lib/foo-1.2.3/...` style path segments.
pub fn detect_version_from_path(path: &Path) -> Option<String> {
    PATH_VERSION
        .captures(&path.to_string_lossy())
        .map(|c| c[1].to_string())
}

/// `OPENSSL_3.0.0`, `GLIBC_2.34` style versioned symbol names.
pub fn detect_version_from_symbols(symbols: &[SymbolInfo]) -> Option<String> {
    symbols
        .iter()
        .find_map(|s| SYMBOL_VERSION.captures(&s.name).map(|c| c[1].to_string()))
}

/// purl type hint derived from the file path: `conan`, `vcpkg`, `system`,
/// or empty for `generic`.
pub fn detect_package_manager(path: &Path) -> String {
    let lossy = path.to_string_lossy();
    if lossy.contains(".conan") {
        "conan".to_string()
    } else if lossy.contains("vcpkg") {
        "vcpkg".to_string()
    } else if is_system_library_path(path) {
        "system".to_string()
    } else {
        String::new()
    }
}

/// True when the canonical path lives under a platform library directory.
pub fn is_system_library_path(path: &Path) -> bool {
    const PREFIXES: &[&str] = &[
        "/lib/",
        "/lib64/",
        "/usr/lib",
        "/usr/local/lib",
        "/System/Library/",
        "/Library/",
        "C:\\Windows\\",
    ];
    let lossy = path.to_string_lossy();
    PREFIXES.iter().any(|p| lossy.starts_with(p))
}

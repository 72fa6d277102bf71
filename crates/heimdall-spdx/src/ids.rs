//! SPDXRef identifier sanitisation.

/// Builds an `SPDXRef-` identifier from a component name.
///
/// Collapses runs of `++` to `+` and `+-` to `-` first, then substitutes
/// space, `/`, `\`, `.`, `_`, and every other disallowed character with
/// `-`. The result always matches `SPDXRef-[A-Za-z0-9+.-]+` and contains
/// neither dots nor underscores.
pub fn spdx_ref(name: &str) -> String {
    let mut collapsed = name.to_string();
    while collapsed.contains("++") {
        collapsed = collapsed.replace("++", "+");
    }
    while collapsed.contains("+-") {
        collapsed = collapsed.replace("+-", "-");
    }

    let mut sanitized: String = collapsed
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '+' => c,
            _ => '-',
        })
        .collect();
    if sanitized.is_empty() {
        sanitized.push_str("unknown");
    }
    format!("SPDXRef-{sanitized}")
}

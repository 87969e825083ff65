//! Module references.
//!
//! Validation and normalization of the `(name, version)` pairs the resolver
//! is asked about:
//! - `react`, `react-dom/client`, `node:fs`
//! - `@types/node`, `@scope/pkg/sub`
//! - versions `latest`, `18.2.0`, `next`

use semver::Version;

/// The dist-tag every published package carries; also the default reference.
pub const LATEST: &str = "latest";

/// Scope holding companion types-only packages.
pub const TYPES_SCOPE: &str = "@types";

/// Node.js built-in modules whose declarations live in `@types/node`.
const NODE_BUILTINS: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "stream/promises",
    "stream/consumers",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Check a module name against the npm naming rules the resolver enforces.
///
/// Names must be non-empty, must not begin with `.` or `_` and must not
/// contain whitespace.
#[must_use]
pub fn is_valid_module_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.starts_with('_')
        && !name.chars().any(char::is_whitespace)
}

/// Map an import specifier onto the package that owns its declarations.
///
/// Node built-ins (and anything `node:`-prefixed) become `node`; in-package
/// sub-paths are stripped so `lodash/fp` and `lodash` share one entry.
#[must_use]
pub fn canonical_module_name(specifier: &str) -> String {
    if specifier.starts_with("node:") || NODE_BUILTINS.contains(&specifier) {
        return "node".to_string();
    }

    let mut parts = specifier.splitn(3, '/');
    let first = parts.next().unwrap_or_default();
    if first.starts_with('@') {
        match parts.next() {
            Some(second) => format!("{first}/{second}"),
            None => first.to_string(),
        }
    } else {
        first.to_string()
    }
}

/// Flatten a scoped package name for path-safe use (`@scope/name` -> `scope__name`).
///
/// Unscoped names are returned unchanged.
#[must_use]
pub fn dt_name(name: &str) -> String {
    match name.strip_prefix('@') {
        Some(rest) if rest.contains('/') => rest.replacen('/', "__", 1),
        _ => name.to_string(),
    }
}

/// Name of the companion types-only package for a module.
#[must_use]
pub fn types_package_name(name: &str) -> String {
    format!("{TYPES_SCOPE}/{}", dt_name(name))
}

/// Build a cache key (`name@version`).
#[must_use]
pub fn module_key(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}

/// Whether a reference already has the shape of a version (`1.2`, `1.2.3`).
///
/// Such references are never treated as dist-tags.
#[must_use]
pub fn looks_like_version(reference: &str) -> bool {
    reference.split('.').count() >= 2
}

/// Classification of a requested version reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRef {
    /// The `latest` dist-tag (or an empty reference).
    Latest,
    /// A valid semantic version.
    Exact(Version),
    /// Any other dist-tag name, resolved through the registry.
    Tag(String),
}

impl VersionRef {
    /// Classify a reference, returning `None` when it can be neither a
    /// version nor a tag (whitespace, or a dotted non-semver like `1.2`).
    #[must_use]
    pub fn classify(reference: &str) -> Option<Self> {
        if reference.is_empty() || reference == LATEST {
            return Some(Self::Latest);
        }
        if let Ok(version) = Version::parse(reference) {
            return Some(Self::Exact(version));
        }
        if reference.chars().any(char::is_whitespace) || looks_like_version(reference) {
            return None;
        }
        Some(Self::Tag(reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_module_names() {
        assert!(is_valid_module_name("react"));
        assert!(is_valid_module_name("@types/node"));
        assert!(is_valid_module_name("left-pad"));
        assert!(is_valid_module_name("lodash.merge"));
    }

    #[test]
    fn test_invalid_module_names() {
        assert!(!is_valid_module_name(""));
        assert!(!is_valid_module_name(".hidden"));
        assert!(!is_valid_module_name("./relative"));
        assert!(!is_valid_module_name("_private"));
        assert!(!is_valid_module_name("pkg with space"));
        assert!(!is_valid_module_name("tab\tname"));
    }

    #[test]
    fn test_canonical_strips_subpath() {
        assert_eq!(canonical_module_name("react-dom/client"), "react-dom");
        assert_eq!(canonical_module_name("lodash/fp/map"), "lodash");
        assert_eq!(canonical_module_name("react"), "react");
    }

    #[test]
    fn test_canonical_scoped() {
        assert_eq!(canonical_module_name("@scope/pkg"), "@scope/pkg");
        assert_eq!(canonical_module_name("@scope/pkg/sub/path"), "@scope/pkg");
        assert_eq!(canonical_module_name("@scope"), "@scope");
    }

    #[test]
    fn test_canonical_node_builtins() {
        assert_eq!(canonical_module_name("fs"), "node");
        assert_eq!(canonical_module_name("fs/promises"), "node");
        assert_eq!(canonical_module_name("node:test"), "node");
        assert_eq!(canonical_module_name("child_process"), "node");
        // Only exact built-in names map; look-alikes are ordinary packages
        assert_eq!(canonical_module_name("fs-extra"), "fs-extra");
    }

    #[test]
    fn test_dt_name() {
        assert_eq!(dt_name("@scope/name"), "scope__name");
        assert_eq!(dt_name("react"), "react");
        assert_eq!(dt_name("@types/node"), "types__node");
        assert_eq!(dt_name("@scope"), "@scope");
    }

    #[test]
    fn test_types_package_name() {
        assert_eq!(types_package_name("lodash"), "@types/lodash");
        assert_eq!(types_package_name("@babel/core"), "@types/babel__core");
    }

    #[test]
    fn test_looks_like_version() {
        assert!(looks_like_version("1.2.3"));
        assert!(looks_like_version("18.0"));
        assert!(!looks_like_version("latest"));
        assert!(!looks_like_version("18"));
    }

    #[test]
    fn test_classify_version() {
        assert_eq!(VersionRef::classify(""), Some(VersionRef::Latest));
        assert_eq!(VersionRef::classify("latest"), Some(VersionRef::Latest));
        assert_eq!(
            VersionRef::classify("1.3.0"),
            Some(VersionRef::Exact(Version::new(1, 3, 0)))
        );
        assert_eq!(
            VersionRef::classify("next"),
            Some(VersionRef::Tag("next".to_string()))
        );
        assert_eq!(VersionRef::classify("1.2"), None);
        assert_eq!(VersionRef::classify("1.2.x"), None);
        assert_eq!(VersionRef::classify("not a tag"), None);
    }
}

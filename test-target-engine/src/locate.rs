//! Deterministic discovery of pre-existing test files.
//!
//! For a source path we derive the base name and extension class, then probe
//! a fixed candidate list through the injected existence check, stopping at
//! the first hit to minimize external calls.
//!
//! Candidate order is location-major: all suffixes for the same directory,
//! then all suffixes for its `__tests__` subdirectory, then the flat
//! configured test directory, then the test directory mirroring the source
//! layout, then a root-level `__tests__` directory.

use tracing::debug;

use crate::RepoFiles;
use crate::errors::CapabilityError;

/// Test-suffix patterns for an extension class, in priority order.
fn suffixes_for(ext: &str) -> &'static [&'static str] {
    match ext {
        "tsx" => &[".test.tsx", ".spec.tsx", ".test.ts", ".spec.ts"],
        "jsx" => &[".test.jsx", ".spec.jsx", ".test.js", ".spec.js"],
        "ts" => &[".test.ts", ".spec.ts"],
        _ => &[".test.js", ".spec.js"],
    }
}

/// Extension class of a source path (`tsx` | `jsx` | `ts` | `js`).
pub fn extension_class(path: &str) -> &'static str {
    if path.ends_with(".tsx") {
        "tsx"
    } else if path.ends_with(".jsx") {
        "jsx"
    } else if path.ends_with(".ts") {
        "ts"
    } else {
        "js"
    }
}

/// Base name of a source path: file name without directory and extension.
pub fn base_name(path: &str) -> &str {
    let file = path.rsplit_once('/').map(|(_, f)| f).unwrap_or(path);
    for ext in [".tsx", ".ts", ".jsx", ".js"] {
        if let Some(stripped) = file.strip_suffix(ext) {
            return stripped;
        }
    }
    file
}

/// Ordered candidate paths for a source file's existing tests.
pub fn candidate_paths(file_path: &str, test_directory: &str) -> Vec<String> {
    let dir = file_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let base = base_name(file_path);
    let suffixes = suffixes_for(extension_class(file_path));

    let mut out = Vec::with_capacity(suffixes.len() * 5);
    // Co-located in same directory
    out.extend(suffixes.iter().map(|s| format!("{dir}/{base}{s}")));
    // Co-located __tests__ directory
    out.extend(suffixes.iter().map(|s| format!("{dir}/__tests__/{base}{s}")));
    // Flat test directory at root
    out.extend(suffixes.iter().map(|s| format!("{test_directory}/{base}{s}")));
    // Test directory mirroring the source structure
    out.extend(suffixes.iter().map(|s| format!("{test_directory}{dir}/{base}{s}")));
    // __tests__ at root
    out.extend(suffixes.iter().map(|s| format!("__tests__/{base}{s}")));
    out
}

/// Probe candidates in order; first confirmed hit wins.
///
/// Transport failures of the existence check propagate and abort the probe
/// sequence for this file.
pub async fn detect_test_file<S: RepoFiles>(
    store: &S,
    git_ref: &str,
    file_path: &str,
    test_directory: &str,
) -> Result<Option<String>, CapabilityError> {
    for candidate in candidate_paths(file_path, test_directory) {
        if store.file_exists(git_ref, &candidate).await? {
            debug!(file = file_path, test = %candidate, "existing test file found");
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

//! In-memory repository store for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::RepoFiles;
use crate::errors::CapabilityError;

#[derive(Default)]
pub(crate) struct MockRepo {
    files: HashMap<String, String>,
    failing: Vec<String>,
    probed: Mutex<Vec<String>>,
}

impl MockRepo {
    pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    /// Any fetch or existence check for `path` fails with a transport error.
    pub(crate) fn with_failing(mut self, path: &str) -> Self {
        self.failing.push(path.to_string());
        self
    }

    /// Paths passed to `file_exists`, in call order.
    pub(crate) fn probes(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

impl RepoFiles for MockRepo {
    async fn fetch_content(&self, _git_ref: &str, path: &str) -> Result<String, CapabilityError> {
        if self.failing.iter().any(|p| p == path) {
            return Err(CapabilityError::Transport(format!("fetch failed: {path}")));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| CapabilityError::NotFound(path.to_string()))
    }

    async fn file_exists(&self, _git_ref: &str, path: &str) -> Result<bool, CapabilityError> {
        self.probed.lock().unwrap().push(path.to_string());
        if self.failing.iter().any(|p| p == path) {
            return Err(CapabilityError::Transport(format!("probe failed: {path}")));
        }
        Ok(self.files.contains_key(path))
    }
}

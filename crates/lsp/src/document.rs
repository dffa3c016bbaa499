//! Document state management for open files in the editor.
//!
//! Open buffers live in a [`Project`] keyed by their URI, wrapped in the
//! checking service so diagnostics and fixes see the latest text.

use std::collections::HashMap;

use trytuple_analyze::{PluginConfig, Project, TupleCheckService};

pub struct DocumentState {
    service: TupleCheckService<Project>,
    versions: HashMap<String, i32>,
}

impl DocumentState {
    pub fn new(config: PluginConfig) -> Self {
        Self {
            service: TupleCheckService::new(Project::new(), config),
            versions: HashMap::new(),
        }
    }

    /// Track a newly opened document.
    pub fn open(&mut self, uri: &str, version: i32, content: String) {
        self.versions.insert(uri.to_owned(), version);
        self.service.upstream_mut().set_file(uri, content);
    }

    /// Replace the content of an open document. Stale versions are
    /// ignored; returns whether the content was taken.
    pub fn change(&mut self, uri: &str, version: i32, content: String) -> bool {
        match self.versions.get_mut(uri) {
            Some(current) if *current <= version => {
                *current = version;
                self.service.upstream_mut().set_file(uri, content);
                true
            }
            _ => false,
        }
    }

    /// Remove a closed document from tracking.
    pub fn close(&mut self, uri: &str) {
        self.versions.remove(uri);
        self.service.upstream_mut().remove_file(uri);
    }

    pub fn is_open(&self, uri: &str) -> bool {
        self.versions.contains_key(uri)
    }

    pub fn version(&self, uri: &str) -> Option<i32> {
        self.versions.get(uri).copied()
    }

    pub fn text(&self, uri: &str) -> Option<&str> {
        self.service.upstream().file_text(uri)
    }

    pub fn service(&self) -> &TupleCheckService<Project> {
        &self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_versions_and_content() {
        let mut docs = DocumentState::new(PluginConfig::default());
        docs.open("file:///a.ts", 1, "let a;".into());
        assert!(docs.change("file:///a.ts", 3, "let b;".into()));
        assert!(!docs.change("file:///a.ts", 2, "let c;".into()));
        assert!(!docs.change("file:///other.ts", 1, "let d;".into()));
        assert_eq!(docs.text("file:///a.ts"), Some("let b;"));
        assert_eq!(docs.version("file:///a.ts"), Some(3));

        docs.close("file:///a.ts");
        assert!(!docs.is_open("file:///a.ts"));
        assert!(docs.text("file:///a.ts").is_none());
    }
}

//! Report sinks for request/response and event attachments
//!
//! Attaching is always best-effort: a failing sink never changes the result
//! of the call being reported on.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// External report collaborator (test report, artifact store, ...)
pub trait ReportSink: Send + Sync {
    fn attach(&self, name: &str, content: &[u8], content_type: &str) -> anyhow::Result<()>;
}

impl<T: ReportSink + ?Sized> ReportSink for Arc<T> {
    fn attach(&self, name: &str, content: &[u8], content_type: &str) -> anyhow::Result<()> {
        (**self).attach(name, content, content_type)
    }
}

/// Attach through `sink`, logging and swallowing any failure
pub fn attach_best_effort(sink: &dyn ReportSink, name: &str, content: &[u8], content_type: &str) {
    if let Err(err) = sink.attach(name, content, content_type) {
        tracing::warn!(attachment = name, error = %format!("{:#}", err), "report attachment failed");
    }
}

/// Writes each attachment as a file under a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: Utf8PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    fn file_name(name: &str, content_type: &str) -> String {
        let slug: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        let slug = slug.trim_matches('-');
        let ext = match content_type {
            CONTENT_TYPE_JSON => "json",
            CONTENT_TYPE_TEXT => "txt",
            _ => "bin",
        };
        format!("{}-{}.{}", Uuid::new_v4(), slug, ext)
    }
}

impl ReportSink for DirectorySink {
    fn attach(&self, name: &str, content: &[u8], content_type: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create report directory {}", self.dir))?;

        let path = self.dir.join(Self::file_name(name, content_type));
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write attachment {}", path))?;
        Ok(())
    }
}

/// One captured attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

impl Attachment {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Keeps attachments in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    attachments: Mutex<Vec<Attachment>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.attachments()
            .into_iter()
            .map(|a| a.name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReportSink for MemorySink {
    fn attach(&self, name: &str, content: &[u8], content_type: &str) -> anyhow::Result<()> {
        self.attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Attachment {
                name: name.to_string(),
                content: content.to_vec(),
                content_type: content_type.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct BrokenSink;

    impl ReportSink for BrokenSink {
        fn attach(&self, _name: &str, _content: &[u8], _content_type: &str) -> anyhow::Result<()> {
            anyhow::bail!("report server unavailable")
        }
    }

    #[test]
    fn test_best_effort_swallows_failure() {
        attach_best_effort(&BrokenSink, "Response Body", b"{}", CONTENT_TYPE_JSON);
    }

    #[test]
    fn test_memory_sink_captures() {
        let sink = MemorySink::new();
        attach_best_effort(&sink, "Request", b"GET /users", CONTENT_TYPE_TEXT);

        let attachments = sink.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].name, "Request");
        assert_eq!(attachments[0].text(), "GET /users");
        assert_eq!(attachments[0].content_type, CONTENT_TYPE_TEXT);
    }

    #[test]
    fn test_directory_sink_writes_files() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().join("reports")).unwrap();
        let sink = DirectorySink::new(dir.clone());

        sink.attach("Response Body", br#"{"ok":true}"#, CONTENT_TYPE_JSON)
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].as_ref().unwrap().file_name();
        let name = name.to_string_lossy();
        assert!(name.ends_with("-response-body.json"));
    }

    #[test]
    fn test_directory_sink_error_has_context() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let dir = Utf8PathBuf::from_path_buf(blocker.join("nested")).unwrap();

        let err = DirectorySink::new(dir).attach("a", b"", CONTENT_TYPE_TEXT).unwrap_err();
        assert!(err.to_string().contains("failed to create report directory"));
    }
}

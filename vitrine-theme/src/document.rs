//! The document seam.
//!
//! Everything the applicator does to a page goes through [`DocumentSurface`].
//! A browser binding would forward to the DOM; [`RecordingDocument`] keeps
//! the resulting document state in memory so effects can be asserted
//! headlessly.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifies a `<meta>` tag by its `name` or `property` attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "attr", content = "key", rename_all = "lowercase")]
pub enum MetaKey {
    Name(String),
    Property(String),
}

impl MetaKey {
    pub fn name(key: impl Into<String>) -> Self {
        Self::Name(key.into())
    }

    pub fn property(key: impl Into<String>) -> Self {
        Self::Property(key.into())
    }
}

impl fmt::Display for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(k) => write!(f, "name={}", k),
            Self::Property(k) => write!(f, "property={}", k),
        }
    }
}

/// A `<link rel=...>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconLink {
    pub rel: String,
    pub href: String,
}

/// A `<script>` element, external (`src`) or inline (`body`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptTag {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub is_async: bool,
}

impl ScriptTag {
    pub fn external(id: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: Some(src.into()),
            body: None,
            is_async: true,
        }
    }

    pub fn inline(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: None,
            body: Some(body.into()),
            is_async: false,
        }
    }
}

/// Mutations the applicator may perform on a document.
///
/// Operations are infallible: a surface that cannot honour one drops it.
pub trait DocumentSurface: Send {
    /// Set a custom property on the root element's inline style.
    fn set_style_property(&mut self, name: &str, value: &str);

    fn remove_style_property(&mut self, name: &str);

    fn set_title(&mut self, title: &str);

    /// Create or update the meta tag identified by `key`.
    fn set_meta(&mut self, key: &MetaKey, content: &str);

    fn remove_meta(&mut self, key: &MetaKey);

    /// Remove every icon link (`rel` containing `icon`). Returns how many
    /// were removed.
    fn remove_icon_links(&mut self) -> usize;

    fn append_icon_link(&mut self, link: IconLink);

    /// Whether a script with this element id is already present.
    fn has_script(&self, id: &str) -> bool;

    fn inject_script(&mut self, script: ScriptTag);
}

/// One recorded mutation, in call order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DocumentEffect {
    SetStyle { name: String, value: String },
    RemoveStyle { name: String },
    SetTitle { title: String },
    SetMeta { key: MetaKey, content: String },
    RemoveMeta { key: MetaKey },
    RemoveIconLinks { removed: usize },
    AppendIconLink { link: IconLink },
    InjectScript { id: String },
}

/// Document state as left by the recorded effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentSnapshot {
    pub style: BTreeMap<String, String>,
    pub title: Option<String>,
    pub meta: BTreeMap<String, String>,
    pub icon_links: Vec<IconLink>,
    pub scripts: Vec<ScriptTag>,
    pub effects: Vec<DocumentEffect>,
}

impl DocumentSnapshot {
    pub fn style(&self, name: &str) -> Option<&str> {
        self.style.get(name).map(String::as_str)
    }

    pub fn meta(&self, key: &MetaKey) -> Option<&str> {
        self.meta.get(&key.to_string()).map(String::as_str)
    }

    pub fn script_count(&self, id: &str) -> usize {
        self.scripts.iter().filter(|s| s.id == id).count()
    }
}

/// In-memory document. Clones share state, so a test can hand one clone
/// to the applicator and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingDocument {
    inner: Arc<Mutex<DocumentSnapshot>>,
}

impl RecordingDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an icon link, as a page's static markup would.
    pub fn with_icon_link(self, href: impl Into<String>) -> Self {
        self.lock().icon_links.push(IconLink {
            rel: "icon".to_string(),
            href: href.into(),
        });
        self
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        self.lock().clone()
    }

    /// Forget recorded effects while keeping document state.
    pub fn clear_effects(&self) {
        self.lock().effects.clear();
    }

    fn lock(&self) -> MutexGuard<'_, DocumentSnapshot> {
        // A panic mid-write leaves plain data behind; keep using it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentSurface for RecordingDocument {
    fn set_style_property(&mut self, name: &str, value: &str) {
        let mut doc = self.lock();
        doc.style.insert(name.to_string(), value.to_string());
        doc.effects.push(DocumentEffect::SetStyle {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_style_property(&mut self, name: &str) {
        let mut doc = self.lock();
        if doc.style.remove(name).is_some() {
            doc.effects.push(DocumentEffect::RemoveStyle {
                name: name.to_string(),
            });
        }
    }

    fn set_title(&mut self, title: &str) {
        let mut doc = self.lock();
        doc.title = Some(title.to_string());
        doc.effects.push(DocumentEffect::SetTitle {
            title: title.to_string(),
        });
    }

    fn set_meta(&mut self, key: &MetaKey, content: &str) {
        let mut doc = self.lock();
        doc.meta.insert(key.to_string(), content.to_string());
        doc.effects.push(DocumentEffect::SetMeta {
            key: key.clone(),
            content: content.to_string(),
        });
    }

    fn remove_meta(&mut self, key: &MetaKey) {
        let mut doc = self.lock();
        if doc.meta.remove(&key.to_string()).is_some() {
            doc.effects.push(DocumentEffect::RemoveMeta { key: key.clone() });
        }
    }

    fn remove_icon_links(&mut self) -> usize {
        let mut doc = self.lock();
        let before = doc.icon_links.len();
        doc.icon_links.retain(|link| !link.rel.contains("icon"));
        let removed = before - doc.icon_links.len();
        doc.effects.push(DocumentEffect::RemoveIconLinks { removed });
        removed
    }

    fn append_icon_link(&mut self, link: IconLink) {
        let mut doc = self.lock();
        doc.icon_links.push(link.clone());
        doc.effects.push(DocumentEffect::AppendIconLink { link });
    }

    fn has_script(&self, id: &str) -> bool {
        self.lock().scripts.iter().any(|s| s.id == id)
    }

    fn inject_script(&mut self, script: ScriptTag) {
        let mut doc = self.lock();
        doc.effects.push(DocumentEffect::InjectScript {
            id: script.id.clone(),
        });
        doc.scripts.push(script);
    }
}

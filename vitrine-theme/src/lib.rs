//! Dynamic tenant theming.
//!
//! [`ThemeApplicator`] turns a [`vitrine_core::Tenant`] into style
//! properties, document metadata, a favicon and analytics tags. It never
//! touches a real document directly: every mutation goes through a
//! [`DocumentSurface`], so the same code drives a browser binding or the
//! in-memory [`RecordingDocument`].

pub mod applicator;
pub mod document;

pub use applicator::{
    cache_busted, default_color, ColorSlot, ThemeApplicator, ThemeReport, ThemeWarning,
};
pub use document::{
    DocumentEffect, DocumentSnapshot, DocumentSurface, IconLink, MetaKey, RecordingDocument,
    ScriptTag,
};

//! Psychoeducation content layered over the semantic index.

pub mod library;
pub mod service;

pub use library::{Article, ContentLibrary};
pub use service::{CONTENT_TYPE, ContentHit, ContentService, DOC_PREFIX};

//! Format conversion adapters.
//!
//! Decks and images reach the merge pipeline through an [`OfficeConverter`].
//! Each operation writes its result into a caller-provided directory inside
//! the job workspace and returns the produced path.

pub mod soffice;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::OutputFormat;
use crate::error::Result;
use crate::input::InputKind;
use crate::job::JobState;

pub use soffice::SofficeConverter;

/// How a batch of decks and images reaches the final format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStrategy {
    /// A single source already in the target format is used as is.
    PassThrough,
    /// A single deck, or a single image with a paginated target, converted
    /// by the office suite.
    ConvertOne,
    /// Several sources, or any image with a deck target, go through the
    /// deck composer.
    Compose,
}

/// Pick the strategy for `sources` and `format`.
///
/// Images never convert straight to a deck format: the office suite opens
/// them in its drawing component, which has no deck export.
pub fn batch_strategy<P: AsRef<Path>>(sources: &[P], format: OutputFormat) -> BatchStrategy {
    let [single] = sources else {
        return BatchStrategy::Compose;
    };
    let single = single.as_ref();

    let in_target_format = single
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(format.extension()));
    if in_target_format {
        return BatchStrategy::PassThrough;
    }

    match InputKind::from_path(single) {
        Some(InputKind::Image) if !format.is_paginated() => BatchStrategy::Compose,
        _ => BatchStrategy::ConvertOne,
    }
}

/// Conversions the executor delegates for deck and image inputs.
#[async_trait]
pub trait OfficeConverter: Send + Sync {
    /// Short adapter name for logs.
    fn name(&self) -> &str;

    /// Whether [`BatchStrategy::Compose`] batches can be handled.
    fn can_compose(&self) -> bool;

    /// Convert a legacy deck (`.ppt`) into a modern deck (`.pptx`).
    async fn legacy_deck_to_modern_deck(
        &self,
        source: &Path,
        out_dir: &Path,
        job: Option<&JobState>,
    ) -> Result<PathBuf>;

    /// Turn one image into a one-page paginated document.
    async fn image_to_single_page_document(
        &self,
        source: &Path,
        out_dir: &Path,
        job: Option<&JobState>,
    ) -> Result<PathBuf>;

    /// Combine decks and images, in order, into one artifact of `format`.
    async fn deck_batch_to_final_format(
        &self,
        sources: &[PathBuf],
        format: OutputFormat,
        out_dir: &Path,
        job: Option<&JobState>,
    ) -> Result<PathBuf>;
}

//! Domain value types for the receipt pipeline.
//!
//! These are the explicit value types behind the wire and template schemas:
//! recognized words with quadrilateral boxes, axis-aligned field rectangles,
//! pages with their style-group assignment, and the per-field extraction
//! results. Region and boundary math lives on the types themselves so the
//! geometry is checked at construction time rather than scattered through
//! the extraction code.

use crate::core::errors::OcrError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A single word produced by the recognition engine.
///
/// The four points describe the word's quadrilateral in page-pixel
/// coordinates, in arbitrary winding order. `content` is non-empty for every
/// word the engine returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    /// The recognized text.
    pub content: String,
    /// The four corners of the word's quadrilateral, `[x, y]` pairs.
    pub points: [[f32; 2]; 4],
}

impl RecognizedWord {
    /// Creates a recognized word from its text and quadrilateral.
    pub fn new(content: impl Into<String>, points: [[f32; 2]; 4]) -> Self {
        Self {
            content: content.into(),
            points,
        }
    }

    /// Returns the axis-aligned bounding box of the quadrilateral.
    pub fn aabb(&self) -> Rect {
        let min_x = self.points.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min);
        let max_x = self
            .points
            .iter()
            .map(|p| p[0])
            .fold(f32::NEG_INFINITY, f32::max);
        let min_y = self.points.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min);
        let max_y = self
            .points
            .iter()
            .map(|p| p[1])
            .fold(f32::NEG_INFINITY, f32::max);
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Returns the vertical center of the word's bounding box.
    pub fn center_y(&self) -> f32 {
        let aabb = self.aabb();
        aabb.y + aabb.h / 2.0
    }
}

/// An axis-aligned rectangle in page-pixel coordinates.
///
/// Bounds are not validated: a rectangle outside the page, or one with zero
/// width or height, simply matches no characters during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// X-coordinate of the left edge.
    pub x: f32,
    /// Y-coordinate of the top edge.
    pub y: f32,
    /// Width of the rectangle.
    pub w: f32,
    /// Height of the rectangle.
    pub h: f32,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// X-coordinate of the right edge.
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Y-coordinate of the bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Returns true if `x` falls within the horizontal extent (inclusive).
    pub fn contains_x(&self, x: f32) -> bool {
        self.x <= x && x <= self.right()
    }

    /// Returns true if `y` falls within the vertical extent (inclusive).
    pub fn contains_y(&self, y: f32) -> bool {
        self.y <= y && y <= self.bottom()
    }
}

/// A labeled field rectangle as defined in a style group's template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    /// The field label (e.g. 日付, 金額).
    pub label: String,
    /// The rectangle where the field's text is expected.
    #[serde(flatten)]
    pub rect: Rect,
}

impl Roi {
    /// Creates a labeled ROI.
    pub fn new(label: impl Into<String>, rect: Rect) -> Self {
        Self {
            label: label.into(),
            rect,
        }
    }
}

/// One extracted field of one page: the raw reconstructed text and its
/// normalized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    /// The field label from the template.
    pub label: String,
    /// The reconstructed text, trimmed of leading/trailing whitespace.
    pub raw_text: String,
    /// The normalized text (canonical date or digit-only amount).
    pub normalized_text: String,
}

/// A single receipt page with its style-group assignment.
///
/// `style_id` is mutable until the caller confirms the grouping; the
/// pipeline itself only reads it.
#[derive(Debug, Clone)]
pub struct Page {
    /// The page image at the ingestion resolution.
    pub image: RgbImage,
    /// 1-based page number within the batch.
    pub page_num: usize,
    /// The style group this page belongs to.
    pub style_id: usize,
}

/// A group of pages that share the same receipt layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleGroup {
    /// The group identifier (opaque; stable only within one clustering run).
    pub id: usize,
    /// Indices into the page batch, in input order.
    pub page_indices: Vec<usize>,
}

impl StyleGroup {
    /// Builds style groups from per-page cluster labels.
    ///
    /// Groups are returned sorted by id; each group's `page_indices` keep
    /// the original input order.
    pub fn from_labels(labels: &[usize]) -> Vec<StyleGroup> {
        let mut groups: Vec<StyleGroup> = Vec::new();
        for (idx, &label) in labels.iter().enumerate() {
            match groups.iter_mut().find(|g| g.id == label) {
                Some(group) => group.page_indices.push(idx),
                None => groups.push(StyleGroup {
                    id: label,
                    page_indices: vec![idx],
                }),
            }
        }
        groups.sort_by_key(|g| g.id);
        groups
    }

    /// The representative page used for template definition (first member).
    pub fn representative(&self) -> Option<usize> {
        self.page_indices.first().copied()
    }
}

/// Field templates per style group: `style_id -> labeled rectangles`.
///
/// Created and edited by the wizard; the pipeline consumes it read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateStore {
    templates: HashMap<usize, Vec<Roi>>,
}

impl TemplateStore {
    /// Creates an empty template store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ROIs for a style group, replacing any previous template.
    pub fn insert(&mut self, style_id: usize, rois: Vec<Roi>) {
        self.templates.insert(style_id, rois);
    }

    /// Returns the ROIs templated for a style group (empty if none).
    pub fn rois_for(&self, style_id: usize) -> &[Roi] {
        self.templates
            .get(&style_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Loads a template store from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, OcrError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| OcrError::InvalidInput {
            message: format!("template file '{}': {}", path.display(), e),
        })
    }
}

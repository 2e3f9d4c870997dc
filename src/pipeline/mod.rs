//! End-to-end batch processing: cluster, recognize, extract, normalize.
//!
//! This is the data flow the wizard drives one step at a time, composed for
//! batch use: pages are clustered into style groups, each page is recognized
//! once through the admission-controlled service, and each templated field
//! of the page's style group is reconstructed and normalized into a row.

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::errors::OcrError;
use crate::domain::{ExtractedField, Page, TemplateStore};
use crate::layout::cluster_pages;
use crate::normalize::normalize_field;
use crate::recognition::OcrService;
use crate::roi::extract_text;

/// One processed page: its identity plus the extracted fields.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptRow {
    /// 1-based page number within the batch.
    pub page_num: usize,
    /// The page's style group.
    pub style_id: usize,
    /// One entry per templated field of the style group.
    pub fields: Vec<ExtractedField>,
}

/// Clusters a batch of page images and wraps them as pages.
///
/// Page numbers are 1-based in input order; style ids come from the layout
/// clusterer and may be remapped by user override before processing.
pub fn ingest_pages(images: Vec<RgbImage>) -> Vec<Page> {
    let labels = cluster_pages(&images);
    info!(
        pages = images.len(),
        groups = labels.iter().copied().max().map(|m| m + 1).unwrap_or(0),
        "pages clustered into style groups"
    );

    images
        .into_iter()
        .zip(labels)
        .enumerate()
        .map(|(idx, (image, style_id))| Page {
            image,
            page_num: idx + 1,
            style_id,
        })
        .collect()
}

/// Processes a page batch into structured rows.
///
/// Each page is recognized once; its style group's template then drives
/// field extraction and normalization. A style group without a template
/// yields a row with no fields rather than an error.
pub async fn process_pages(
    service: &OcrService,
    pages: &[Page],
    templates: &TemplateStore,
) -> Result<Vec<ReceiptRow>, OcrError> {
    let mut rows = Vec::with_capacity(pages.len());

    for page in pages {
        let words = service.recognize(page.image.clone()).await?;
        debug!(
            page = page.page_num,
            style = page.style_id,
            words = words.len(),
            "page recognized"
        );

        let rois = templates.rois_for(page.style_id);
        let mut fields = Vec::with_capacity(rois.len());
        for roi in rois {
            let raw = extract_text(&words, &roi.rect).trim().to_string();
            let normalized = normalize_field(&roi.label, &raw);
            fields.push(ExtractedField {
                label: roi.label.clone(),
                raw_text: raw,
                normalized_text: normalized,
            });
        }

        rows.push(ReceiptRow {
            page_num: page.page_num,
            style_id: page.style_id,
            fields,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ServiceConfig;
    use crate::domain::{RecognizedWord, Rect, Roi};
    use crate::recognition::RecognitionBackend;
    use image::Rgb;
    use std::sync::Arc;

    /// Returns the same word list for every page.
    struct FixedBackend {
        words: Vec<RecognizedWord>,
    }

    impl RecognitionBackend for FixedBackend {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<RecognizedWord>, OcrError> {
            Ok(self.words.clone())
        }
    }

    fn form_page(stripe_period: u32) -> RgbImage {
        RgbImage::from_fn(80, 100, |x, y| {
            if y % stripe_period < 3 && x > 4 && x < 76 {
                Rgb([10, 10, 10])
            } else {
                Rgb([250, 250, 250])
            }
        })
    }

    #[test]
    fn ingest_assigns_same_style_to_identical_pages() {
        let page = form_page(11);
        let pages = ingest_pages(vec![page.clone(), page]);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_num, 1);
        assert_eq!(pages[1].page_num, 2);
        assert_eq!(pages[0].style_id, pages[1].style_id);
    }

    #[tokio::test]
    async fn extracts_and_normalizes_templated_fields() {
        // A word whose bounding-box center falls inside the amount rect.
        let backend = Arc::new(FixedBackend {
            words: vec![RecognizedWord::new(
                "1,234円",
                [[100.0, 50.0], [220.0, 50.0], [220.0, 70.0], [100.0, 70.0]],
            )],
        });
        let service = OcrService::with_backend(&ServiceConfig::default(), backend);

        let mut templates = TemplateStore::new();
        templates.insert(
            0,
            vec![Roi::new("金額", Rect::new(90.0, 45.0, 150.0, 30.0))],
        );

        let pages = vec![Page {
            image: form_page(11),
            page_num: 1,
            style_id: 0,
        }];

        let rows = process_pages(&service, &pages, &templates)
            .await
            .expect("process");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields.len(), 1);
        assert_eq!(rows[0].fields[0].raw_text, "1,234円");
        assert_eq!(rows[0].fields[0].normalized_text, "1234");
    }

    #[tokio::test]
    async fn missing_template_yields_empty_row() {
        let service = OcrService::with_backend(
            &ServiceConfig::default(),
            Arc::new(FixedBackend { words: Vec::new() }),
        );
        let pages = vec![Page {
            image: form_page(11),
            page_num: 1,
            style_id: 5,
        }];

        let rows = process_pages(&service, &pages, &TemplateStore::new())
            .await
            .expect("process");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].fields.is_empty());
    }
}

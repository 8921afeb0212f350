//! Extraction policies: turn an open document into bounded model input.
//!
//! Both policies are deterministic functions of the document. They never
//! fail with an error: every outcome, including an unreadable page, is a
//! variant of [`ExtractionOutcome`] that the orchestrator routes on.
//!
//! ## Text-only sampling
//!
//! ```text
//! page 1 (full) ─┬─ page 2 (first N chars) ─┬─ ...[CONTENIDO OMITIDO]... ─ last page (full)
//!                │  only if ≥ 2 pages       │  only if > 2 pages
//! ```
//!
//! The head of a document carries the title, parties and subject; the tail
//! carries signatures and resolutive clauses. The middle is rarely needed to
//! tell a contract from a memo, so it is dropped rather than spent against
//! the character budget.

use crate::error::DocumentFault;
use crate::pipeline::document::PageSource;
use image::DynamicImage;
use tracing::debug;

/// Marker inserted between the sampled head and the final page.
pub const OMISSION_MARKER: &str = "...[CONTENIDO OMITIDO]...";

/// What extraction produced for one document.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// Content ready for screening and prompting.
    Content(ExtractedContent),
    /// The document has zero pages.
    Empty,
    /// The document could not be read; detail is already truncated.
    Corrupt(String),
}

impl ExtractionOutcome {
    /// Route the outcome: content continues, everything else is a fault.
    pub fn into_content(self) -> Result<ExtractedContent, DocumentFault> {
        match self {
            ExtractionOutcome::Content(content) => Ok(content),
            ExtractionOutcome::Empty => Err(DocumentFault::Empty),
            ExtractionOutcome::Corrupt(detail) => Err(DocumentFault::Corrupt { detail }),
        }
    }
}

impl From<DocumentFault> for ExtractionOutcome {
    fn from(fault: DocumentFault) -> Self {
        match fault {
            DocumentFault::Empty => ExtractionOutcome::Empty,
            DocumentFault::Corrupt { detail } => ExtractionOutcome::Corrupt(detail),
            other => ExtractionOutcome::Corrupt(DocumentFault::corrupt(other.to_string()).to_string()),
        }
    }
}

/// Bounded content extracted from a document.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Whitespace-collapsed excerpt, within the policy's character budget.
    pub text: String,
    /// Rendered first page (hybrid only).
    pub image: Option<DynamicImage>,
}

impl ExtractedContent {
    /// Length of the excerpt in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Limits for [`sample_text`].
#[derive(Debug, Clone, Copy)]
pub struct TextSampling {
    /// Characters kept from page 2.
    pub second_page_chars: usize,
    /// Final excerpt budget.
    pub max_chars: usize,
}

/// Limits for [`snapshot_first_page`].
#[derive(Debug, Clone, Copy)]
pub struct FirstPageSnapshot {
    pub dpi: u32,
    pub max_pixels: u32,
    /// Budget for the page-1 text sent alongside the image.
    pub max_chars: usize,
}

/// Text-only policy: sample the first, second and last pages.
pub fn sample_text(source: &dyn PageSource, limits: &TextSampling) -> ExtractionOutcome {
    let pages = source.page_count();
    if pages == 0 {
        return ExtractionOutcome::Empty;
    }

    let mut raw = match source.page_text(0) {
        Ok(text) => text,
        Err(fault) => return fault.into(),
    };

    if pages > 1 {
        match source.page_text(1) {
            Ok(text) => {
                raw.push('\n');
                raw.push_str(&truncate_chars(&text, limits.second_page_chars));
            }
            Err(fault) => return fault.into(),
        }
    }

    if pages > 2 {
        match source.page_text(pages - 1) {
            Ok(text) => {
                raw.push('\n');
                raw.push_str(OMISSION_MARKER);
                raw.push('\n');
                raw.push_str(&text);
            }
            Err(fault) => return fault.into(),
        }
    }

    let text = truncate_chars(&collapse_whitespace(&raw), limits.max_chars);
    debug!("Sampled {} chars from {} page(s)", text.chars().count(), pages);
    ExtractionOutcome::Content(ExtractedContent { text, image: None })
}

/// Hybrid policy: render page 1 and take its text layer.
///
/// Double quotes in the text are swapped for single quotes so the excerpt
/// can sit inside a quoted block of the prompt.
pub fn snapshot_first_page(
    source: &dyn PageSource,
    limits: &FirstPageSnapshot,
) -> ExtractionOutcome {
    if source.page_count() == 0 {
        return ExtractionOutcome::Empty;
    }

    let image = match source.render_page(0, limits.dpi, limits.max_pixels) {
        Ok(image) => image,
        Err(fault) => return fault.into(),
    };
    let raw = match source.page_text(0) {
        Ok(text) => text,
        Err(fault) => return fault.into(),
    };

    let text = truncate_chars(&collapse_whitespace(&raw), limits.max_chars).replace('"', "'");
    ExtractionOutcome::Content(ExtractedContent {
        text,
        image: Some(image),
    })
}

/// Collapse every whitespace run to a single space and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The first `max` characters of `s`, never splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    struct Pages {
        texts: Vec<String>,
        broken_page: Option<usize>,
    }

    impl Pages {
        fn new(texts: &[&str]) -> Self {
            Self {
                texts: texts.iter().map(|t| t.to_string()).collect(),
                broken_page: None,
            }
        }
    }

    impl PageSource for Pages {
        fn page_count(&self) -> usize {
            self.texts.len()
        }

        fn page_text(&self, index: usize) -> Result<String, DocumentFault> {
            if self.broken_page == Some(index) {
                return Err(DocumentFault::corrupt(format!("page {} unreadable", index + 1)));
            }
            Ok(self.texts[index].clone())
        }

        fn render_page(
            &self,
            _index: usize,
            _dpi: u32,
            _max_pixels: u32,
        ) -> Result<DynamicImage, DocumentFault> {
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]))))
        }
    }

    const SAMPLING: TextSampling = TextSampling {
        second_page_chars: 500,
        max_chars: 4000,
    };

    const SNAPSHOT: FirstPageSnapshot = FirstPageSnapshot {
        dpi: 150,
        max_pixels: 2000,
        max_chars: 2000,
    };

    fn text_of(outcome: ExtractionOutcome) -> String {
        match outcome {
            ExtractionOutcome::Content(c) => c.text,
            other => panic!("expected content, got {other:?}"),
        }
    }

    #[test]
    fn zero_pages_is_empty() {
        assert!(matches!(sample_text(&Pages::new(&[]), &SAMPLING), ExtractionOutcome::Empty));
        assert!(matches!(
            snapshot_first_page(&Pages::new(&[]), &SNAPSHOT),
            ExtractionOutcome::Empty
        ));
    }

    #[test]
    fn single_page_has_no_marker() {
        let text = text_of(sample_text(&Pages::new(&["CONTRATO  de\n\narrendamiento"]), &SAMPLING));
        assert_eq!(text, "CONTRATO de arrendamiento");
    }

    #[test]
    fn two_pages_take_head_of_second() {
        let second = "b".repeat(800);
        let text = text_of(sample_text(&Pages::new(&["primera", &second]), &SAMPLING));
        assert_eq!(text, format!("primera {}", "b".repeat(500)));
        assert!(!text.contains(OMISSION_MARKER));
    }

    #[test]
    fn marker_only_for_more_than_two_pages() {
        let text = text_of(sample_text(
            &Pages::new(&["uno", "dos", "tres", "cuatro final"]),
            &SAMPLING,
        ));
        assert_eq!(text, format!("uno dos {OMISSION_MARKER} cuatro final"));
        assert!(!text.contains("tres"));
    }

    #[test]
    fn excerpt_respects_budget_on_multibyte_text() {
        let page = "ñ".repeat(5000);
        let text = text_of(sample_text(&Pages::new(&[&page]), &SAMPLING));
        assert_eq!(text.chars().count(), 4000);
    }

    #[test]
    fn unreadable_page_is_corrupt() {
        let mut pages = Pages::new(&["uno", "dos", "tres"]);
        pages.broken_page = Some(2);
        match sample_text(&pages, &SAMPLING) {
            ExtractionOutcome::Corrupt(detail) => assert!(detail.contains("page 3")),
            other => panic!("expected corrupt, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_swaps_quotes_and_keeps_image() {
        let pages = Pages::new(&["Asunto: \"Circular\"   interna", "ignored"]);
        match snapshot_first_page(&pages, &SNAPSHOT) {
            ExtractionOutcome::Content(c) => {
                assert_eq!(c.text, "Asunto: 'Circular' interna");
                assert!(c.image.is_some());
            }
            other => panic!("expected content, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_truncates_text() {
        let page = "x ".repeat(3000);
        let text = text_of(snapshot_first_page(&Pages::new(&[&page]), &SNAPSHOT));
        assert_eq!(text.chars().count(), 2000);
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("añb", 2), "añ");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn collapse_trims_and_joins() {
        assert_eq!(collapse_whitespace("  a\t\tb \n c  "), "a b c");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn outcome_routes_to_faults() {
        assert_eq!(ExtractionOutcome::Empty.into_content().unwrap_err(), DocumentFault::Empty);
        assert_eq!(
            ExtractionOutcome::Corrupt("bad".into()).into_content().unwrap_err(),
            DocumentFault::Corrupt { detail: "bad".into() }
        );
    }
}

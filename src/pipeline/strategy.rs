//! Classification strategies: what to extract and how to ask for it.
//!
//! Text-only and hybrid classification differ only in the extraction
//! policy, the prompt and a couple of sampling knobs. Everything after the
//! model answers goes through the one shared normalizer. A strategy is the
//! seam that captures that difference:
//!
//! | Step | Text-only | Hybrid |
//! |------|-----------|--------|
//! | `extract` | sample pages 1, 2 and last | render page 1 + its text |
//! | `screen` | reject excerpts below the threshold | accept everything |
//! | `build_request` | system message + text prompt | text prompt + JPEG |
//! | `normalize_options` | raw score | score rounded to 2 decimals |

use crate::config::{ClassificationMode, ClassifierConfig};
use crate::error::DocumentFault;
use crate::pipeline::document::PageSource;
use crate::pipeline::encode::{encode_page, EncodedImage};
use crate::pipeline::extract::{
    sample_text, snapshot_first_page, ExtractedContent, ExtractionOutcome, FirstPageSnapshot,
    TextSampling,
};
use crate::pipeline::normalize::NormalizeOptions;
use crate::prompts::{hybrid_prompt, text_only_prompt, JSON_ONLY_SYSTEM_PROMPT};
use std::sync::Arc;

/// Sampling knobs sent with a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceOptions {
    pub max_tokens: usize,
    pub temperature: f32,
    /// Only sent when set.
    pub seed: Option<u64>,
}

impl InferenceOptions {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.resolved_temperature(),
            seed: config.resolved_seed(),
        }
    }
}

/// Everything the inference client needs for one document.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub image: Option<EncodedImage>,
    pub options: InferenceOptions,
}

/// One way of turning a document into a model request.
pub trait ClassificationStrategy: Send + Sync {
    fn mode(&self) -> ClassificationMode;

    /// Pull bounded content out of an open document. Runs on the blocking pool.
    fn extract(&self, source: &dyn PageSource) -> ExtractionOutcome;

    /// Decide whether extracted content is worth a model call.
    fn screen(&self, _content: &ExtractedContent) -> Result<(), DocumentFault> {
        Ok(())
    }

    fn build_request(&self, content: ExtractedContent)
        -> Result<ClassificationRequest, DocumentFault>;

    fn normalize_options(&self) -> NormalizeOptions;
}

/// Build the strategy selected by `config.mode`.
pub fn strategy_for(config: &ClassifierConfig) -> Arc<dyn ClassificationStrategy> {
    match config.mode {
        ClassificationMode::TextOnly => Arc::new(TextOnlyStrategy::from_config(config)),
        ClassificationMode::Hybrid => Arc::new(HybridStrategy::from_config(config)),
    }
}

// ── Text-only ────────────────────────────────────────────────────────────

/// Sampled text, no image.
#[derive(Debug, Clone)]
pub struct TextOnlyStrategy {
    sampling: TextSampling,
    min_text_chars: usize,
    options: InferenceOptions,
}

impl TextOnlyStrategy {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            sampling: TextSampling {
                second_page_chars: config.second_page_chars,
                max_chars: config.max_chars,
            },
            min_text_chars: config.min_text_chars,
            options: InferenceOptions::from_config(config),
        }
    }
}

impl ClassificationStrategy for TextOnlyStrategy {
    fn mode(&self) -> ClassificationMode {
        ClassificationMode::TextOnly
    }

    fn extract(&self, source: &dyn PageSource) -> ExtractionOutcome {
        sample_text(source, &self.sampling)
    }

    fn screen(&self, content: &ExtractedContent) -> Result<(), DocumentFault> {
        let chars = content.char_count();
        if chars < self.min_text_chars {
            return Err(DocumentFault::BelowTextThreshold {
                chars,
                min: self.min_text_chars,
            });
        }
        Ok(())
    }

    fn build_request(
        &self,
        content: ExtractedContent,
    ) -> Result<ClassificationRequest, DocumentFault> {
        Ok(ClassificationRequest {
            system: Some(JSON_ONLY_SYSTEM_PROMPT.to_string()),
            prompt: text_only_prompt(&content.text),
            image: None,
            options: self.options,
        })
    }

    fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions::TEXT_ONLY
    }
}

// ── Hybrid ───────────────────────────────────────────────────────────────

/// Page-1 image plus page-1 text.
#[derive(Debug, Clone)]
pub struct HybridStrategy {
    snapshot: FirstPageSnapshot,
    options: InferenceOptions,
}

impl HybridStrategy {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            snapshot: FirstPageSnapshot {
                dpi: config.dpi,
                max_pixels: config.max_rendered_pixels,
                max_chars: config.hybrid_text_chars,
            },
            options: InferenceOptions::from_config(config),
        }
    }
}

impl ClassificationStrategy for HybridStrategy {
    fn mode(&self) -> ClassificationMode {
        ClassificationMode::Hybrid
    }

    fn extract(&self, source: &dyn PageSource) -> ExtractionOutcome {
        snapshot_first_page(source, &self.snapshot)
    }

    fn build_request(
        &self,
        content: ExtractedContent,
    ) -> Result<ClassificationRequest, DocumentFault> {
        let image = content
            .image
            .as_ref()
            .ok_or_else(|| DocumentFault::PipelineFault("hybrid content has no page image".into()))?;
        let encoded = encode_page(image)
            .map_err(|e| DocumentFault::PipelineFault(format!("JPEG encoding failed: {e}")))?;

        Ok(ClassificationRequest {
            system: None,
            prompt: hybrid_prompt(&content.text),
            image: Some(encoded),
            options: self.options,
        })
    }

    fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions::HYBRID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::normalize::ParseFailure;
    use image::{DynamicImage, Rgb, RgbImage};

    fn content(text: &str, with_image: bool) -> ExtractedContent {
        ExtractedContent {
            text: text.to_string(),
            image: with_image
                .then(|| DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])))),
        }
    }

    #[test]
    fn text_screen_threshold_is_inclusive() {
        let s = TextOnlyStrategy::from_config(&ClassifierConfig::default());
        assert_eq!(
            s.screen(&content(&"a".repeat(49), false)),
            Err(DocumentFault::BelowTextThreshold { chars: 49, min: 50 })
        );
        assert!(s.screen(&content(&"a".repeat(50), false)).is_ok());
    }

    #[test]
    fn text_request_is_deterministic_and_imageless() {
        let s = TextOnlyStrategy::from_config(&ClassifierConfig::default());
        let req = s.build_request(content("Memorando Para: De: Asunto:", false)).unwrap();
        assert_eq!(req.system.as_deref(), Some(JSON_ONLY_SYSTEM_PROMPT));
        assert!(req.image.is_none());
        assert_eq!(req.options.temperature, 0.0);
        assert_eq!(req.options.seed, Some(42));
        assert_eq!(req.options.max_tokens, 300);
        assert_eq!(s.normalize_options(), NormalizeOptions::TEXT_ONLY);
        assert_eq!(s.normalize_options().parse_failure, ParseFailure::Error);
    }

    #[test]
    fn hybrid_request_carries_jpeg() {
        let config = ClassifierConfig::builder()
            .mode(ClassificationMode::Hybrid)
            .build()
            .unwrap();
        let s = strategy_for(&config);
        assert_eq!(s.mode(), ClassificationMode::Hybrid);
        assert!(s.screen(&content("", true)).is_ok());

        let req = s.build_request(content("Circular", true)).unwrap();
        assert!(req.system.is_none());
        assert_eq!(req.image.unwrap().mime_type, "image/jpeg");
        assert_eq!(req.options.temperature, 0.1);
        assert_eq!(req.options.seed, None);
        assert!(s.normalize_options().round_score);
        assert_eq!(s.normalize_options().parse_failure, ParseFailure::ManualReview);
    }

    #[test]
    fn hybrid_without_image_is_a_pipeline_fault() {
        let s = HybridStrategy::from_config(&ClassifierConfig::default());
        let err = s.build_request(content("x", false)).unwrap_err();
        assert!(matches!(err, DocumentFault::PipelineFault(_)));
    }
}

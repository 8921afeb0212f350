//! Response normalization: untrusted model text → bounded result.
//!
//! Models are asked for a raw three-key JSON object and routinely answer
//! with something else: fenced blocks, a sentence of preamble, Spanish key
//! names, plural labels, `"0,87"` as a score. [`normalize`] absorbs all of
//! that and never fails. Every input maps to a [`ClassificationResult`]
//! whose category is in the closed set and whose score is in `[0.0, 1.0]`.
//!
//! ## Steps
//!
//! 1. Strip Markdown fence tokens anywhere in the text, then trim.
//! 2. Keep the span from the first `{` to the last `}`.
//! 3. Parse it as JSON.
//! 4. Read `category`, `score` and `evidence` tolerantly (Spanish aliases,
//!    type coercion, documented defaults). String labels are trimmed before
//!    they are uppercased, so `" contrato "` is accepted.
//!
//! Labels outside the five classifiable categories become `REVISION_MANUAL`.
//! The one sentinel a model may answer with is `REVISION_MANUAL` itself;
//! `ERROR`, `VACIO` and `ARCHIVO_CORRUPTO` describe pipeline outcomes and are
//! downgraded to `REVISION_MANUAL` with score 0.0.
//!
//! A result that was produced by this function, serialised back to JSON and
//! normalized again comes back unchanged, except for the `ERROR` a text-only
//! parse failure yields, which re-normalizes to `REVISION_MANUAL`.

use crate::category::Category;
use crate::error::DocumentFault;
use crate::output::ClassificationResult;
use crate::pipeline::extract::truncate_chars;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Evidence used when the model sent no usable `evidence` field.
pub const MISSING_EVIDENCE: &str = "no detailed evidence";

/// Score used when the model sent no usable `score` field.
pub const DEFAULT_SCORE: f64 = 0.5;

const CATEGORY_KEYS: [&str; 2] = ["category", "categoria"];
const SCORE_KEYS: [&str; 2] = ["score", "confianza"];
const EVIDENCE_KEYS: [&str; 2] = ["evidence", "evidencia"];

/// Three backticks plus an optional language tag.
static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").unwrap());

/// What a response with braces but broken JSON syntax turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseFailure {
    /// `ERROR`, parser message truncated to 100 characters.
    #[default]
    Error,
    /// `REVISION_MANUAL`, parser message truncated to 50 characters.
    ManualReview,
}

/// Per-strategy normalization knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Round the score to two decimals.
    pub round_score: bool,
    /// Outcome of a JSON syntax error.
    pub parse_failure: ParseFailure,
}

impl NormalizeOptions {
    /// Text-only: raw scores, syntax errors are pipeline errors.
    pub const TEXT_ONLY: NormalizeOptions = NormalizeOptions {
        round_score: false,
        parse_failure: ParseFailure::Error,
    };

    /// Hybrid: two-decimal scores, syntax errors go to manual review.
    pub const HYBRID: NormalizeOptions = NormalizeOptions {
        round_score: true,
        parse_failure: ParseFailure::ManualReview,
    };
}

/// Normalize a raw model response. Never fails.
pub fn normalize(raw: &str, options: &NormalizeOptions) -> ClassificationResult {
    debug!("Raw model response: {:?}", raw);

    let object = match parse_object(raw, options) {
        Ok(object) => object,
        Err(fault) => {
            warn!("Unusable model response ({}): {:?}", fault, truncate_chars(raw, 200));
            return fault.into_result();
        }
    };

    let score = read_score(&object, options);
    let evidence = read_evidence(&object);
    let token = read_category_token(&object);

    match resolve_category(&token) {
        Resolved::Label(category) => ClassificationResult::new(category, score, evidence),
        Resolved::Unknown => {
            let fault = DocumentFault::InvalidCategory { label: token };
            warn!("{}; routing to manual review", fault);
            ClassificationResult::new(fault.sentinel(), score, evidence)
        }
        Resolved::ReservedSentinel(sentinel) => {
            warn!("Model answered with reserved label {}; routing to manual review", sentinel);
            ClassificationResult::new(Category::RevisionManual, 0.0, evidence)
        }
    }
}

/// Steps 1–3: isolate and parse the JSON object.
fn parse_object(raw: &str, options: &NormalizeOptions) -> Result<Map<String, Value>, DocumentFault> {
    let cleaned = RE_FENCE.replace_all(raw, "");
    let cleaned = cleaned.trim();

    let span = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => return Err(DocumentFault::MalformedResponse),
    };

    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DocumentFault::PipelineFault(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(match options.parse_failure {
            ParseFailure::ManualReview => DocumentFault::invalid_json(e.to_string()),
            ParseFailure::Error => DocumentFault::UnparseableResponse {
                detail: e.to_string(),
            },
        }),
    }
}

/// First present, non-null value among `keys`.
fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find(|v| !v.is_null())
}

fn read_category_token(object: &Map<String, Value>) -> String {
    let text = match field(object, &CATEGORY_KEYS) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    text.to_uppercase().replace(' ', "_")
}

enum Resolved {
    Label(Category),
    Unknown,
    ReservedSentinel(Category),
}

/// Map a canonicalised token to a label.
///
/// Classifiable labels match exactly or with one trailing `S`.
/// `REVISION_MANUAL` is accepted as an answer; the other sentinels are
/// reserved for the pipeline.
fn resolve_category(token: &str) -> Resolved {
    if let Some(category) = Category::classifiable_from_token(token) {
        return Resolved::Label(category);
    }
    if let Some(singular) = token.strip_suffix('S') {
        if let Some(category) = Category::classifiable_from_token(singular) {
            debug!("Repaired plural category '{}' → {}", token, category);
            return Resolved::Label(category);
        }
    }
    match token.parse::<Category>() {
        Ok(Category::RevisionManual) => Resolved::Label(Category::RevisionManual),
        Ok(sentinel) if sentinel.is_sentinel() => Resolved::ReservedSentinel(sentinel),
        _ => Resolved::Unknown,
    }
}

fn read_score(object: &Map<String, Value>, options: &NormalizeOptions) -> f64 {
    let score = match field(object, &SCORE_KEYS) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(DEFAULT_SCORE),
        Some(Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().unwrap_or(DEFAULT_SCORE),
        _ => DEFAULT_SCORE,
    };
    let score = if score.is_finite() { score } else { DEFAULT_SCORE };
    let score = score.clamp(0.0, 1.0);

    if options.round_score {
        (score * 100.0).round() / 100.0
    } else {
        score
    }
}

fn read_evidence(object: &Map<String, Value>) -> String {
    match field(object, &EVIDENCE_KEYS) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => MISSING_EVIDENCE.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: NormalizeOptions = NormalizeOptions::TEXT_ONLY;
    const HYBRID: NormalizeOptions = NormalizeOptions::HYBRID;

    fn check(raw: &str, category: Category, score: f64, evidence: &str) {
        let r = normalize(raw, &TEXT);
        assert_eq!(r.category(), category, "category for {raw:?}");
        assert_eq!(r.score(), score, "score for {raw:?}");
        assert_eq!(r.evidence(), evidence, "evidence for {raw:?}");
    }

    #[test]
    fn valid_response_passes_through() {
        for (i, c) in Category::CLASSIFIABLE.iter().enumerate() {
            let score = i as f64 / 5.0;
            let raw = format!(r#"{{"category": "{c}", "score": {score}, "evidence": "ok"}}"#);
            check(&raw, *c, score, "ok");
        }
    }

    #[test]
    fn fenced_spanish_plural_comma_scenario() {
        let raw = "```json\n{\"categoria\": \"CONTRATOS\", \"score\": \"0,91\", \"evidencia\": \"Cláusulas, Contratante\"}\n```";
        check(raw, Category::Contrato, 0.91, "Cláusulas, Contratante");
    }

    #[test]
    fn apology_without_braces() {
        check(
            "Lo siento, no puedo procesar esto.",
            Category::RevisionManual,
            0.0,
            "model did not return valid JSON",
        );
    }

    #[test]
    fn reversed_braces_are_not_an_object() {
        check("} nada {", Category::RevisionManual, 0.0, "model did not return valid JSON");
    }

    #[test]
    fn plural_labels_are_repaired() {
        for c in Category::CLASSIFIABLE {
            let raw = format!(r#"{{"category": "{}S", "score": 0.7}}"#, c);
            assert_eq!(normalize(&raw, &TEXT).category(), c);
        }
    }

    #[test]
    fn lowercase_and_spaces_are_canonicalised() {
        let r = normalize(r#"{"category": "  informe tecnico ", "score": 0.6}"#, &TEXT);
        assert_eq!(r.category(), Category::InformeTecnico);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        check(r#"{"category": "CONTRATO", "score": 1.5, "evidence": ""}"#, Category::Contrato, 1.0, "");
        check(r#"{"category": "CONTRATO", "score": -0.3, "evidence": ""}"#, Category::Contrato, 0.0, "");
        check(r#"{"category": "CONTRATO", "score": "7,5", "evidence": ""}"#, Category::Contrato, 1.0, "");
    }

    #[test]
    fn comma_decimal_string() {
        let r = normalize(r#"{"category": "CONTRATO", "score": "0,87"}"#, &TEXT);
        assert_eq!(r.score(), 0.87);
    }

    #[test]
    fn unusable_scores_default() {
        for raw in [
            r#"{"category": "CONTRATO"}"#,
            r#"{"category": "CONTRATO", "score": null}"#,
            r#"{"category": "CONTRATO", "score": "alta"}"#,
            r#"{"category": "CONTRATO", "score": [1]}"#,
            r#"{"category": "CONTRATO", "score": "NaN"}"#,
        ] {
            assert_eq!(normalize(raw, &TEXT).score(), DEFAULT_SCORE, "{raw}");
        }
    }

    #[test]
    fn confianza_alias_is_read() {
        let r = normalize(r#"{"categoria": "CONTRATO", "confianza": 0.8}"#, &TEXT);
        assert_eq!(r.score(), 0.8);
    }

    #[test]
    fn hybrid_rounds_to_two_decimals() {
        let r = normalize(r#"{"category": "CONTRATO", "score": 0.876}"#, &HYBRID);
        assert_eq!(r.score(), 0.88);
        let r = normalize(r#"{"category": "CONTRATO", "score": 0.876}"#, &TEXT);
        assert_eq!(r.score(), 0.876);
    }

    #[test]
    fn invalid_json_syntax_in_hybrid_goes_to_manual_review() {
        let r = normalize(r#"{"category": "CONTRATO", "score": }"#, &HYBRID);
        assert_eq!(r.category(), Category::RevisionManual);
        assert_eq!(r.score(), 0.0);
        assert!(r.evidence().starts_with("invalid JSON syntax: "));
        assert!(r.evidence().chars().count() <= "invalid JSON syntax: ".len() + 50);
    }

    #[test]
    fn invalid_json_syntax_in_text_only_is_an_error() {
        let r = normalize(r#"{"categoria": "CONTRATO", "score": }"#, &TEXT);
        assert_eq!(r.category(), Category::Error);
        assert_eq!(r.score(), 0.0);
        assert!(r.evidence().starts_with("invalid JSON syntax: expected value"));
        assert!(r.evidence().chars().count() <= 100);
    }

    #[test]
    fn unknown_category_keeps_score_and_evidence() {
        check(
            r#"{"category": "FACTURA", "score": 0.9, "evidence": "Total a pagar"}"#,
            Category::RevisionManual,
            0.9,
            "Total a pagar",
        );
    }

    #[test]
    fn missing_category_goes_to_manual_review() {
        let r = normalize(r#"{"score": 0.4}"#, &TEXT);
        assert_eq!(r.category(), Category::RevisionManual);
        assert_eq!(r.evidence(), MISSING_EVIDENCE);
    }

    #[test]
    fn non_string_values_are_coerced() {
        let r = normalize(r#"{"category": 5, "score": 0.4, "evidence": ["Firma", "Cláusulas"]}"#, &TEXT);
        assert_eq!(r.category(), Category::RevisionManual);
        assert_eq!(r.evidence(), r#"["Firma","Cláusulas"]"#);
    }

    #[test]
    fn array_wrapped_object_is_unwrapped() {
        let r = normalize(r#"[{"category": "CONTRATO"}]"#, &TEXT);
        assert_eq!(r.category(), Category::Contrato);
        assert_eq!(r.score(), DEFAULT_SCORE);
    }

    #[test]
    fn two_objects_are_invalid_json() {
        let r = normalize(r#"{"a": 1} trailing {"b": 2}"#, &HYBRID);
        assert_eq!(r.category(), Category::RevisionManual);
        assert!(r.evidence().starts_with("invalid JSON syntax"));
    }

    #[test]
    fn prose_around_object_is_ignored() {
        let r = normalize(
            "Claro, aquí está: {\"category\": \"COMUNICACION_INTERNA\", \"score\": 0.95, \"evidence\": \"Asunto:\"} ¡Saludos!",
            &TEXT,
        );
        assert_eq!(r.category(), Category::ComunicacionInterna);
        assert_eq!(r.score(), 0.95);
    }

    #[test]
    fn reserved_sentinels_are_downgraded_to_manual_review() {
        for label in ["ERROR", "VACIO", "ARCHIVO_CORRUPTO", "vacio", " Error "] {
            let raw = format!(r#"{{"category": "{label}", "score": 0.9, "evidence": "x"}}"#);
            for options in [TEXT, HYBRID] {
                let r = normalize(&raw, &options);
                assert_eq!(r.category(), Category::RevisionManual, "{label}");
                assert_eq!(r.score(), 0.0, "{label}");
                assert_eq!(r.evidence(), "x");
            }
        }
    }

    #[test]
    fn sentinel_answer_passes_through() {
        let r = normalize(r#"{"category": "REVISION_MANUAL", "score": 0.2, "evidence": "ilegible"}"#, &HYBRID);
        assert_eq!(r.category(), Category::RevisionManual);
        assert_eq!(r.score(), 0.2);
    }

    #[test]
    fn normalized_output_is_a_fixed_point() {
        let inputs = [
            "```json\n{\"categoria\": \"CONTRATOS\", \"score\": \"0,91\", \"evidencia\": \"Cláusulas\"}\n```",
            "Lo siento, no puedo procesar esto.",
            r#"{"category": "FACTURA", "score": 1.7}"#,
            r#"{"category": "INFORME_TECNICO", "score": 0.333333, "evidence": null}"#,
            r#"{"category": "VACIO", "score": 0.9}"#,
        ];
        for options in [TEXT, HYBRID] {
            for raw in inputs {
                let first = normalize(raw, &options);
                let reserialised = serde_json::to_string(&first).unwrap();
                let second = normalize(&reserialised, &options);
                assert_eq!(first, second, "not stable for {raw:?}");
            }
        }
        let hybrid_parse_failure = normalize(r#"{"category": "CONTRATO", "score": }"#, &HYBRID);
        let again = normalize(&serde_json::to_string(&hybrid_parse_failure).unwrap(), &HYBRID);
        assert_eq!(hybrid_parse_failure, again);
    }

    #[test]
    fn text_only_parse_error_renormalizes_to_manual_review() {
        let first = normalize(r#"{"category": "CONTRATO", "score": }"#, &TEXT);
        assert_eq!(first.category(), Category::Error);
        let second = normalize(&serde_json::to_string(&first).unwrap(), &TEXT);
        assert_eq!(second.category(), Category::RevisionManual);
        assert_eq!(second.score(), 0.0);
        assert_eq!(second.evidence(), first.evidence());
    }
}

//! Prompt templates for document classification.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: the category definitions and the JSON
//!    output contract are written once and shared by both strategies.
//!
//! 2. **Testability**: unit tests inspect the rendered prompts directly
//!    without calling a model, so a dropped definition or a broken contract
//!    line is caught as a regression.
//!
//! Prompts are in Spanish to match the vocabulary of the documents and of the
//! keyword hints in [`crate::category::DEFINITIONS`].

use crate::category::definitions_block;

/// System message for text-only requests.
pub const JSON_ONLY_SYSTEM_PROMPT: &str = "Eres un asistente administrativo experto que SOLO habla en JSON. \
No incluyas explicaciones, markdown ni texto adicional.";

/// The output contract appended to every prompt.
///
/// Exactly three keys, raw JSON, no fences. The normalizer still tolerates
/// fences, Spanish key names and comma decimals, because models drift.
pub const OUTPUT_CONTRACT: &str = r#"RESPONDE ÚNICAMENTE CON UN OBJETO JSON RAW (sin Markdown, sin bloques de código, sin explicaciones previas ni posteriores) con exactamente estas tres claves:
{"category": "NOMBRE_CATEGORIA", "score": <número entre 0.0 y 1.0>, "evidence": "palabras clave o breve justificación"}"#;

/// Prompt for text-only classification of a sampled excerpt.
pub fn text_only_prompt(excerpt: &str) -> String {
    format!(
        r#"Eres un experto analista documental.

OBJETIVO: Clasificar el texto proporcionado según las siguientes definiciones estrictas.

DEFINICIONES:
{definitions}

CONTENIDO DEL DOCUMENTO:
"{excerpt}"

INSTRUCCIONES:
1. Busca palabras clave específicas de las definiciones.
2. Determina la categoría más probable.
3. Asigna un score de confianza (0.0 a 1.0).

{contract}"#,
        definitions = definitions_block(),
        excerpt = excerpt,
        contract = OUTPUT_CONTRACT,
    )
}

/// Prompt for hybrid classification; the page image travels alongside it.
pub fn hybrid_prompt(page_text: &str) -> String {
    format!(
        r#"Eres un clasificador documental experto para una entidad pública.

TU OBJETIVO: Clasificar el documento basándote en la IMAGEN visual y el TEXTO extraído.

DEFINICIONES DE CATEGORÍAS (Criterios estrictos):
{definitions}

TEXTO EXTRAÍDO DEL DOCUMENTO:
"{page_text}..."

INSTRUCCIONES DE SALIDA:
1. Analiza si el documento cumple con las palabras clave visuales o textuales definidas.
2. Si no encaja claramente en ninguna, usa "REVISION_MANUAL".
3. 'score' debe representar tu nivel de certeza (0.0 a 1.0).

{contract}"#,
        definitions = definitions_block(),
        page_text = page_text,
        contract = OUTPUT_CONTRACT,
    )
}

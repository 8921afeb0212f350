//! The closed label set a document can be assigned.
//!
//! Five substantive categories describe what a document *is*. Four sentinel
//! outcomes describe why no substantive category could be assigned. Both live
//! in one enum so a [`crate::output::ClassificationResult`] always carries
//! exactly one label, and so the report column has a single vocabulary.
//!
//! | Label | Kind | Meaning |
//! |-------|------|---------|
//! | `QUEJA_RECLAMO` | category | citizen complaint or petition |
//! | `CONTRATO` | category | agreement between parties |
//! | `RESOLUCION_ADMINISTRATIVA` | category | formal administrative act |
//! | `INFORME_TECNICO` | category | progress, diagnostic or results report |
//! | `COMUNICACION_INTERNA` | category | memo or circular |
//! | `REVISION_MANUAL` | sentinel | model reachable but unhelpful, or no text layer |
//! | `ERROR` | sentinel | inference or pipeline malfunction |
//! | `VACIO` | sentinel | document has no pages |
//! | `ARCHIVO_CORRUPTO` | sentinel | file could not be opened or read |

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A classification label: one of five categories or one of four sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    QuejaReclamo,
    Contrato,
    ResolucionAdministrativa,
    InformeTecnico,
    ComunicacionInterna,
    RevisionManual,
    Error,
    Vacio,
    ArchivoCorrupto,
}

impl Category {
    /// The five labels a model is allowed to answer with.
    pub const CLASSIFIABLE: [Category; 5] = [
        Category::QuejaReclamo,
        Category::Contrato,
        Category::ResolucionAdministrativa,
        Category::InformeTecnico,
        Category::ComunicacionInterna,
    ];

    /// Every label, sentinels last.
    pub const ALL: [Category; 9] = [
        Category::QuejaReclamo,
        Category::Contrato,
        Category::ResolucionAdministrativa,
        Category::InformeTecnico,
        Category::ComunicacionInterna,
        Category::RevisionManual,
        Category::Error,
        Category::Vacio,
        Category::ArchivoCorrupto,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::QuejaReclamo => "QUEJA_RECLAMO",
            Category::Contrato => "CONTRATO",
            Category::ResolucionAdministrativa => "RESOLUCION_ADMINISTRATIVA",
            Category::InformeTecnico => "INFORME_TECNICO",
            Category::ComunicacionInterna => "COMUNICACION_INTERNA",
            Category::RevisionManual => "REVISION_MANUAL",
            Category::Error => "ERROR",
            Category::Vacio => "VACIO",
            Category::ArchivoCorrupto => "ARCHIVO_CORRUPTO",
        }
    }

    /// `true` for the four non-substantive outcomes.
    pub fn is_sentinel(self) -> bool {
        !Self::CLASSIFIABLE.contains(&self)
    }

    /// Look up a classifiable label by its exact canonical token.
    ///
    /// Sentinels are deliberately not matched: a model answering `VACIO` or
    /// `ERROR` has not produced a usable category.
    pub fn classifiable_from_token(token: &str) -> Option<Category> {
        Self::CLASSIFIABLE
            .iter()
            .copied()
            .find(|c| c.as_str() == token)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category label '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

// ── Definitions ──────────────────────────────────────────────────────────

/// Business definition of one classifiable category.
///
/// Descriptions and keywords are in Spanish because they are matched against
/// Spanish administrative documents.
#[derive(Debug, Clone, Copy)]
pub struct CategoryDefinition {
    pub category: Category,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
}

/// The process-wide definition table, in prompt order.
pub const DEFINITIONS: [CategoryDefinition; 5] = [
    CategoryDefinition {
        category: Category::QuejaReclamo,
        description: "Documentos donde un ciudadano expresa inconformidad.",
        keywords: &[
            "Petición",
            "Reclamo",
            "Solicito",
            "Inconformidad",
            "Derecho de petición",
        ],
    },
    CategoryDefinition {
        category: Category::Contrato,
        description: "Acuerdos legales entre partes.",
        keywords: &[
            "Contratante",
            "Contratista",
            "Cláusulas",
            "Objeto del contrato",
            "Prestación de servicios",
            "Firma",
        ],
    },
    CategoryDefinition {
        category: Category::ResolucionAdministrativa,
        description: "Actos administrativos formales.",
        keywords: &[
            "RESOLUCION No",
            "RESUELVE",
            "CONSIDERANDO",
            "ARTICULO PRIMERO",
            "COMUNIQUESE Y CUMPLASE",
        ],
    },
    CategoryDefinition {
        category: Category::InformeTecnico,
        description: "Reportes de avance, diagnósticos o resultados.",
        keywords: &[
            "Informe de gestión",
            "Resultados",
            "Diagnóstico",
            "Objetivo",
            "Alcance",
            "Conclusiones",
        ],
    },
    CategoryDefinition {
        category: Category::ComunicacionInterna,
        description: "Memorandos o circulares.",
        keywords: &[
            "Memorando",
            "Circular",
            "Para:",
            "De:",
            "Asunto:",
            "Cordial saludo",
        ],
    },
];

static DEFINITIONS_BLOCK: Lazy<String> = Lazy::new(|| {
    DEFINITIONS
        .iter()
        .enumerate()
        .map(|(i, def)| {
            let keywords = def
                .keywords
                .iter()
                .map(|k| format!("\"{k}\""))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{}. {}: {} Palabras clave: {}.",
                i + 1,
                def.category,
                def.description,
                keywords
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
});

/// The numbered definition block embedded in every prompt.
pub fn definitions_block() -> &'static str {
    &DEFINITIONS_BLOCK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&Category::ResolucionAdministrativa).unwrap();
        assert_eq!(json, "\"RESOLUCION_ADMINISTRATIVA\"");
        let back: Category = serde_json::from_str("\"ARCHIVO_CORRUPTO\"").unwrap();
        assert_eq!(back, Category::ArchivoCorrupto);
    }

    #[test]
    fn as_str_matches_serde_for_every_label() {
        for c in Category::ALL {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json.trim_matches('"'), c.as_str());
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
    }

    #[test]
    fn sentinels_are_not_classifiable() {
        assert!(Category::Vacio.is_sentinel());
        assert!(Category::RevisionManual.is_sentinel());
        assert!(!Category::Contrato.is_sentinel());
        assert_eq!(Category::classifiable_from_token("ERROR"), None);
        assert_eq!(
            Category::classifiable_from_token("INFORME_TECNICO"),
            Some(Category::InformeTecnico)
        );
    }

    #[test]
    fn definitions_cover_every_classifiable_label() {
        let block = definitions_block();
        for c in Category::CLASSIFIABLE {
            assert!(block.contains(c.as_str()), "missing {c}");
        }
        assert!(block.starts_with("1. QUEJA_RECLAMO:"));
        assert!(block.contains("\"COMUNIQUESE Y CUMPLASE\""));
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "FACTURA".parse::<Category>().unwrap_err();
        assert!(err.to_string().contains("FACTURA"));
    }
}

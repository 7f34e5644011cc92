//! # Patrones de ruta
//! src/router/pattern.rs
//!
//! `/users/{id:\d+}/files/{name}` se compila en
//! `[Literal("users"), Param(id, \d+), Literal("files"), Param(name, .*)]`.

use crate::util::split_path;

/// Regex de `{name}` sin restricción
pub const WILDCARD: &str = ".*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param { name: String, regex: String },
}

/// Compila un patrón completo en segmentos
pub fn parse_pattern(pattern: &str) -> Vec<Segment> {
    split_path(pattern)
        .iter()
        .map(|segment| parse_segment(segment))
        .collect()
}

/// `{name}`, `{name:regex}` o literal.
///
/// Sintaxis rota (`{` sin `}`, o `:` antes de `{`) deja el segmento como
/// literal de su texto crudo.
pub fn parse_segment(segment: &str) -> Segment {
    let literal = || Segment::Literal(segment.to_string());

    let Some(open) = segment.find('{') else {
        return literal();
    };
    // El último '}' cierra: la regex puede tener cuantificadores {n}
    let Some(close) = segment.rfind('}').filter(|&close| close > open) else {
        tracing::warn!(segment = %segment, "Parámetro sin '}}', se trata como literal");
        return literal();
    };
    if segment[..open].contains(':') {
        tracing::warn!(segment = %segment, "':' antes de '{{', se trata como literal");
        return literal();
    }

    let inner = &segment[open + 1..close];
    let (name, regex) = inner.split_once(':').unwrap_or((inner, WILDCARD));

    Segment::Param {
        name: name.to_string(),
        regex: regex.to_string(),
    }
}

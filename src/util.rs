//! # Utilidades de strings
//! src/util.rs
//!
//! Primitivas de split/trim/url-decode que consume el parser de requests.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

/// Mapa nombre → valor para args de ruta, query y formularios.
///
/// Las claves son únicas: una escritura posterior sobrescribe la anterior.
pub type ParamMap = HashMap<String, String>;

/// Separa un path en segmentos, descartando los vacíos al inicio y al final
///
/// ```
/// use ember_http::util::split_path;
///
/// assert_eq!(split_path("/users/42/"), vec!["users", "42"]);
/// assert!(split_path("/").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('/').map(str::to_string).collect()
}

/// Quita espacios y comillas dobles alrededor de un token
pub fn trim_quotes(s: &str) -> &str {
    s.trim().trim_matches('"')
}

/// Divide una vez en `sep` y recorta ambos lados.
///
/// Sin separador, el token completo queda como valor bajo la clave vacía.
pub fn split_once_trimmed(item: &str, sep: char) -> (&str, &str) {
    match item.split_once(sep) {
        Some((key, value)) => (trim_quotes(key), trim_quotes(value)),
        None => ("", trim_quotes(item)),
    }
}

/// Decodifica `application/x-www-form-urlencoded` (`+` es espacio)
///
/// Secuencias `%XX` inválidas se dejan tal cual; bytes no UTF-8 se
/// reemplazan por U+FFFD.
pub fn url_decode(s: &str) -> String {
    let plus_as_space = s.replace('+', " ");
    percent_decode_str(&plus_as_space)
        .decode_utf8_lossy()
        .into_owned()
}

/// Parser genérico de listas `nombre=valor`.
///
/// Lo usan la query string (`&`, `=`), los bodies url-encoded (`&`, `=`) y
/// las listas de parámetros de `Content-Type` / `Content-Disposition`
/// (`;`, `=`). Solo las dos primeras piden `decode`.
pub fn parse_pairs(buf: &str, item_sep: char, kv_sep: char, decode: bool, target: &mut ParamMap) {
    for item in buf.split(item_sep) {
        if item.trim().is_empty() {
            continue;
        }

        let (key, value) = split_once_trimmed(item, kv_sep);
        let value = if decode {
            url_decode(value)
        } else {
            value.to_string()
        };

        target.insert(key.to_string(), value);
    }
}

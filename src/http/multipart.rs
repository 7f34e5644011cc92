//! # Decodificación multipart/form-data
//! src/http/multipart.rs
//!
//! ```text
//! --XYZ\r\n
//! Content-Disposition: form-data; name="f"\r\n
//! \r\n
//! hello\r\n
//! --XYZ--\r\n
//! ```
//!
//! Cada parte tiene un bloque de headers terminado por una línea vacía y
//! luego datos crudos hasta la siguiente línea de boundary. `--XYZ--`
//! termina todo el body.

use percent_encoding::percent_decode_str;

use crate::util::{parse_pairs, ParamMap};

/// Parámetros útiles de un header `Content-Disposition`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disposition {
    /// Clave del campo de formulario
    pub name: Option<String>,
    /// Nombre de archivo (`filename*` tiene prioridad sobre `filename`)
    pub filename: Option<String>,
}

impl Disposition {
    /// Parsea el valor de un header `Content-Disposition`
    ///
    /// # Ejemplo
    /// ```
    /// use ember_http::http::multipart::Disposition;
    ///
    /// let d = Disposition::parse(r#"form-data; name="avatar"; filename="me.png""#);
    /// assert_eq!(d.name.as_deref(), Some("avatar"));
    /// assert_eq!(d.filename.as_deref(), Some("me.png"));
    /// ```
    pub fn parse(value: &str) -> Self {
        let mut params = header_params(value);

        let filename = params
            .get("filename*")
            .and_then(|ext| decode_ext_value(ext))
            .or_else(|| params.get("filename").cloned());

        Self {
            name: params.remove("name"),
            filename,
        }
    }
}

/// Parámetros `clave=valor` de un header, con las claves en minúsculas
fn header_params(value: &str) -> ParamMap {
    let mut raw = ParamMap::new();
    parse_pairs(value, ';', '=', false, &mut raw);

    raw.into_iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect()
}

/// Decodifica un ext-value de RFC 5987: `UTF-8'lang'a%20b.txt`
fn decode_ext_value(value: &str) -> Option<String> {
    let mut pieces = value.splitn(3, '\'');
    let (_charset, _lang, encoded) = (pieces.next()?, pieces.next()?, pieces.next()?);
    Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned())
}

/// Extrae el boundary de un `Content-Type: multipart/form-data; boundary=X`
///
/// El valor puede venir entre comillas.
pub fn boundary_of(content_type: &str) -> Option<String> {
    let (_, params) = content_type.split_once(';')?;

    header_params(params)
        .remove("boundary")
        .filter(|boundary| !boundary.is_empty())
}

#[derive(Debug, Default)]
struct Part {
    disposition: Disposition,
    data: String,
}

enum State {
    Preamble,
    Headers(Part),
    Data(Part),
}

/// Decodifica un body multipart dentro de `form` (y `files` para partes con
/// nombre de archivo).
///
/// Una parte que no queda cerrada por otro boundary se descarta.
pub fn parse_multipart(body: &str, boundary: &str, form: &mut ParamMap, files: &mut ParamMap) {
    let delimiter = format!("--{}", boundary);
    let closing = format!("{}--", delimiter);
    let mut state = State::Preamble;

    for raw_line in body.split_inclusive('\n') {
        let line = strip_line_end(raw_line);
        let marker = line.trim_end();

        if marker == delimiter || marker == closing {
            if let State::Data(part) | State::Headers(part) = state {
                store_part(part, form, files);
            }
            if marker == closing {
                return;
            }
            state = State::Headers(Part::default());
            continue;
        }

        state = match state {
            State::Preamble => State::Preamble,
            State::Headers(part) if line.is_empty() => State::Data(part),
            State::Headers(mut part) => {
                if let Some((name, value)) = line.split_once(':') {
                    if name.trim().eq_ignore_ascii_case("content-disposition") {
                        part.disposition = Disposition::parse(value);
                    }
                }
                State::Headers(part)
            }
            State::Data(mut part) => {
                part.data.push_str(raw_line);
                State::Data(part)
            }
        };
    }

    if !matches!(state, State::Preamble) {
        tracing::debug!(boundary = %boundary, "Body multipart sin boundary final, se descarta la última parte");
    }
}

fn strip_line_end(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn store_part(mut part: Part, form: &mut ParamMap, files: &mut ParamMap) {
    let Some(name) = part.disposition.name.take() else {
        tracing::debug!("Parte multipart sin name, se ignora");
        return;
    };

    // El salto de línea antes del boundary pertenece al delimitador
    let data = strip_line_end(&part.data).to_string();

    if let Some(filename) = part.disposition.filename.take() {
        files.insert(name.clone(), filename);
    }
    form.insert(name, data);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str, boundary: &str) -> (ParamMap, ParamMap) {
        let mut form = ParamMap::new();
        let mut files = ParamMap::new();
        parse_multipart(body, boundary, &mut form, &mut files);
        (form, files)
    }

    #[test]
    fn test_boundary_unquoted() {
        assert_eq!(
            boundary_of("multipart/form-data; boundary=XYZ").as_deref(),
            Some("XYZ")
        );
    }

    #[test]
    fn test_boundary_quoted() {
        assert_eq!(
            boundary_of("multipart/form-data; charset=utf-8; boundary=\"a b\"").as_deref(),
            Some("a b")
        );
    }

    #[test]
    fn test_boundary_key_any_case() {
        assert_eq!(
            boundary_of("multipart/form-data; Boundary=XYZ").as_deref(),
            Some("XYZ")
        );
    }

    #[test]
    fn test_disposition_keys_any_case() {
        let d = Disposition::parse(r#"form-data; Name="f"; FILENAME="a.txt""#);
        assert_eq!(d.name.as_deref(), Some("f"));
        assert_eq!(d.filename.as_deref(), Some("a.txt"));

        let body = "--B\r\nContent-Disposition: form-data; NAME=\"f\"\r\n\r\nhello\r\n--B--\r\n";
        let (form, _) = decode(body, "B");
        assert_eq!(form["f"], "hello");
    }

    #[test]
    fn test_boundary_missing() {
        assert_eq!(boundary_of("multipart/form-data"), None);
        assert_eq!(boundary_of("multipart/form-data; boundary="), None);
    }

    #[test]
    fn test_single_part() {
        let body = "--XYZ\r\nContent-Disposition: form-data; name=\"f\"\r\n\r\nhello\r\n--XYZ--\r\n";
        let (form, files) = decode(body, "XYZ");

        assert_eq!(form.len(), 1);
        assert_eq!(form["f"], "hello");
        assert!(files.is_empty());
    }

    #[test]
    fn test_multiple_parts_and_multiline_value() {
        let body = concat!(
            "preamble ignored\r\n",
            "--B\r\n",
            "Content-Disposition: form-data; name=\"a\"\r\n",
            "\r\n",
            "line one\r\n",
            "line two\r\n",
            "--B\r\n",
            "content-disposition: form-data; name=b\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "2\r\n",
            "--B--\r\n",
            "epilogue ignored\r\n",
        );
        let (form, _) = decode(body, "B");

        assert_eq!(form["a"], "line one\r\nline two");
        assert_eq!(form["b"], "2");
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn test_file_part_exposes_filename() {
        let body = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"doc\"; filename=\"notes.txt\"\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "contenido\r\n",
            "--B--\r\n",
        );
        let (form, files) = decode(body, "B");

        assert_eq!(form["doc"], "contenido");
        assert_eq!(files["doc"], "notes.txt");
    }

    #[test]
    fn test_extended_filename_wins() {
        let d = Disposition::parse("form-data; name=x; filename=\"plain.txt\"; filename*=UTF-8''caf%C3%A9.txt");
        assert_eq!(d.filename.as_deref(), Some("café.txt"));
    }

    #[test]
    fn test_unterminated_part_is_dropped() {
        let body = concat!(
            "--B\r\n",
            "Content-Disposition: form-data; name=\"ok\"\r\n",
            "\r\n",
            "1\r\n",
            "--B\r\n",
            "Content-Disposition: form-data; name=\"cut\"\r\n",
            "\r\n",
            "never closed",
        );
        let (form, _) = decode(body, "B");

        assert_eq!(form["ok"], "1");
        assert!(!form.contains_key("cut"));
    }

    #[test]
    fn test_part_without_name_is_ignored() {
        let body = "--B\r\nContent-Type: text/plain\r\n\r\nx\r\n--B--\r\n";
        let (form, _) = decode(body, "B");
        assert!(form.is_empty());
    }

    #[test]
    fn test_bare_lf_lines() {
        let body = "--B\nContent-Disposition: form-data; name=\"f\"\n\nhello\n--B--\n";
        let (form, _) = decode(body, "B");
        assert_eq!(form["f"], "hello");
    }

    #[test]
    fn test_wrong_boundary_yields_nothing() {
        let body = "--XYZ\r\nContent-Disposition: form-data; name=\"f\"\r\n\r\nhello\r\n--XYZ--\r\n";
        let (form, _) = decode(body, "OTHER");
        assert!(form.is_empty());
    }
}

//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! Parser best-effort: input malformado del cliente degrada a campos vacíos,
//! nunca a un error. Solo una falla del transporte impide producir un
//! `Request`.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /users/42?verbose=1#frag HTTP/1.1\r\n
//! Host: device.local\r\n
//! Content-Type: application/x-www-form-urlencoded\r\n
//! \r\n
//! name=John%20Doe
//! ```
//!
//! 1. **Request Line**: se corta en el primer y el último espacio
//! 2. **Headers**: `Name: Value` hasta la primera línea vacía
//! 3. **URI**: path antes de `?`, query entre `?` y `#`, fragmento descartado
//! 4. **Body**: url-encoded o multipart según `Content-Type`

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use super::multipart;
use crate::error::Result;
use crate::server::Transport;
use crate::util::{parse_pairs, split_path, ParamMap};

/// Un request HTTP parseado
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Método en mayúsculas (ej: "GET")
    method: String,

    /// URI cruda tal como llegó en el request line
    uri: String,

    /// Segmentos del path
    path: Vec<String>,

    /// Parámetros de ruta, los llena el router durante el dispatch
    args: ParamMap,

    /// Query parameters (url-decoded)
    query: ParamMap,

    /// Campos de formulario (url-encoded o multipart)
    form: ParamMap,

    /// Headers; nombre sensible a mayúsculas, un header repetido sobrescribe
    headers: HashMap<String, String>,

    /// Campo multipart → nombre de archivo enviado
    files: ParamMap,

    /// Body crudo
    body: Vec<u8>,
}

impl Request {
    /// Lee un request completo del transporte y lo parsea
    ///
    /// Una falla de lectura se propaga como `Error::Io`.
    pub fn read_from<T: Transport + ?Sized>(transport: &mut T) -> Result<Self> {
        let raw = transport.receive()?;
        Ok(Self::parse(&raw))
    }

    /// Parsea un request desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use ember_http::http::Request;
    ///
    /// let request = Request::parse(b"GET /sensors/7?unit=c HTTP/1.0\r\n\r\n");
    ///
    /// assert_eq!(request.method(), "GET");
    /// assert_eq!(request.path(), ["sensors", "7"]);
    /// assert_eq!(request.query_param("unit"), Some("c"));
    /// ```
    pub fn parse(raw: &[u8]) -> Self {
        let mut request = Request::default();
        let mut rest = raw;
        let mut seen_start_line = false;

        loop {
            let (line, next) = match rest.iter().position(|&b| b == b'\n') {
                Some(i) => (&rest[..i], Some(&rest[i + 1..])),
                None => (rest, None),
            };
            let line = line.strip_suffix(b"\r").unwrap_or(line);

            if !seen_start_line {
                // Líneas vacías antes del request line se ignoran
                if !line.is_empty() || next.is_none() {
                    request.parse_start_line(&String::from_utf8_lossy(line));
                    seen_start_line = true;
                }
            } else if line.is_empty() {
                request.body = next.unwrap_or_default().to_vec();
                break;
            } else {
                request.parse_header_line(&String::from_utf8_lossy(line));
            }

            match next {
                Some(next) => rest = next,
                None => break,
            }
        }

        request.parse_uri();
        request.parse_body();
        request
    }

    /// `METHOD SP URI SP VERSION`; sin espacio el request line es inválido
    fn parse_start_line(&mut self, line: &str) {
        let (Some(first), Some(last)) = (line.find(' '), line.rfind(' ')) else {
            tracing::debug!(line = %line, "Request line sin espacios, se ignora");
            return;
        };

        self.method = line[..first].to_ascii_uppercase();

        // Con un solo espacio no hay versión: todo lo demás es la URI
        let uri = if last > first {
            &line[first + 1..last]
        } else {
            &line[first + 1..]
        };
        self.uri = uri.to_string();
    }

    fn parse_header_line(&mut self, line: &str) {
        match line.split_once(':') {
            Some((name, value)) => {
                self.headers.insert(name.to_string(), value.trim().to_string());
            }
            None => tracing::debug!(line = %line, "Header sin ':', se ignora"),
        }
    }

    fn parse_uri(&mut self) {
        let query_start = self.uri.find('?');
        let fragment_start = self.uri.find('#');

        let path_end = [query_start, fragment_start]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(self.uri.len());
        self.path = split_path(&self.uri[..path_end]);

        if let Some(q) = query_start {
            let query_end = match fragment_start {
                Some(f) if f < q => return, // el '?' está dentro del fragmento
                Some(f) => f,
                None => self.uri.len(),
            };
            parse_pairs(&self.uri[q + 1..query_end], '&', '=', true, &mut self.query);
        }
    }

    fn parse_body(&mut self) {
        if let Some(declared) = self
            .header_ignore_case("Content-Length")
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.body.truncate(declared);
        }

        let Some(content_type) = self.header_ignore_case("Content-Type").map(str::to_string) else {
            return;
        };
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "application/x-www-form-urlencoded" => {
                let body = String::from_utf8_lossy(&self.body).into_owned();
                parse_pairs(&body, '&', '=', true, &mut self.form);
            }
            "multipart/form-data" => match multipart::boundary_of(&content_type) {
                Some(boundary) => {
                    let body = String::from_utf8_lossy(&self.body).into_owned();
                    multipart::parse_multipart(&body, &boundary, &mut self.form, &mut self.files);
                }
                None => tracing::debug!(content_type = %content_type, "multipart sin boundary"),
            },
            _ => {}
        }
    }

    // === Accesores ===

    /// Método HTTP en mayúsculas (vacío si el request line era inválido)
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn args(&self) -> &ParamMap {
        &self.args
    }

    /// Reemplaza los parámetros de ruta capturados por el router
    pub fn set_args(&mut self, args: ParamMap) {
        self.args = args;
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).map(String::as_str)
    }

    pub fn query(&self) -> &ParamMap {
        &self.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn form(&self) -> &ParamMap {
        &self.form
    }

    pub fn form_field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    /// Nombre de archivo enviado en el campo multipart `field`
    pub fn filename(&self, field: &str) -> Option<&str> {
        self.files.get(field).map(String::as_str)
    }

    pub fn files(&self) -> &ParamMap {
        &self.files
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Header exacto, tal como llegó
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Header sin distinguir mayúsculas
    pub fn header_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body como String, si es UTF-8 válido
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }
}

/// Lee y convierte un parámetro de cualquier `ParamMap`
///
/// # Ejemplo
/// ```
/// use ember_http::http::{param, Request};
///
/// let request = Request::parse(b"GET /led?level=128&on=true HTTP/1.0\r\n\r\n");
/// assert_eq!(param::<u8>(request.query(), "level"), Some(128));
/// assert_eq!(param::<bool>(request.query(), "on"), Some(true));
/// assert_eq!(param::<u8>(request.query(), "missing"), None);
/// ```
pub fn param<T: FromStr>(map: &ParamMap, name: &str) -> Option<T> {
    map.get(name)?.parse().ok()
}

/// Render de depuración de un path
pub fn dump_path(name: &str, path: &[String]) -> String {
    let mut out = format!("{} : \n[\n", name);
    for segment in path {
        out.push_str(&format!("\t{}\n", segment));
    }
    out.push_str("]\n");
    out
}

/// Render de depuración de un `ParamMap`, con claves ordenadas
pub fn dump_params(name: &str, params: &ParamMap) -> String {
    let sorted: BTreeMap<_, _> = params.iter().collect();
    let mut out = format!("{} : \n{{\n", name);
    for (key, value) in sorted {
        out.push_str(&format!("\t{}: {}\n", key, value));
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::server::MemoryTransport;

    #[test]
    fn test_parse_simple_get() {
        let request = Request::parse(b"GET / HTTP/1.0\r\n\r\n");

        assert_eq!(request.method(), "GET");
        assert_eq!(request.uri(), "/");
        assert!(request.path().is_empty());
        assert!(request.query().is_empty());
        assert!(request.args().is_empty());
    }

    #[test]
    fn test_method_is_uppercased() {
        let request = Request::parse(b"post /x HTTP/1.1\r\n\r\n");
        assert_eq!(request.method(), "POST");
    }

    #[test]
    fn test_parse_path_segments() {
        let request = Request::parse(b"GET /base/img/logo.png HTTP/1.1\r\n\r\n");
        assert_eq!(request.path(), ["base", "img", "logo.png"]);
    }

    #[test]
    fn test_parse_query_params() {
        let request = Request::parse(b"GET /x?a=1&b=2 HTTP/1.1\r\n\r\n");

        assert_eq!(request.path(), ["x"]);
        assert_eq!(request.query().len(), 2);
        assert_eq!(request.query_param("a"), Some("1"));
        assert_eq!(request.query_param("b"), Some("2"));
    }

    #[test]
    fn test_duplicate_query_key_last_wins() {
        let request = Request::parse(b"GET /x?a=1&a=2 HTTP/1.1\r\n\r\n");

        assert_eq!(request.query().len(), 1);
        assert_eq!(request.query_param("a"), Some("2"));
    }

    #[test]
    fn test_query_token_without_equals() {
        let request = Request::parse(b"GET /x?debug&a=1 HTTP/1.1\r\n\r\n");

        assert_eq!(request.query_param(""), Some("debug"));
        assert_eq!(request.query_param("a"), Some("1"));
    }

    #[test]
    fn test_query_url_decode() {
        let request = Request::parse(b"GET /say?text=hello%20world+again HTTP/1.0\r\n\r\n");
        assert_eq!(request.query_param("text"), Some("hello world again"));
    }

    #[test]
    fn test_fragment_is_discarded() {
        let request = Request::parse(b"GET /page?a=1#b=2 HTTP/1.1\r\n\r\n");

        assert_eq!(request.path(), ["page"]);
        assert_eq!(request.query_param("a"), Some("1"));
        assert_eq!(request.query_param("b"), None);
    }

    #[test]
    fn test_question_mark_inside_fragment() {
        let request = Request::parse(b"GET /page#top?a=1 HTTP/1.1\r\n\r\n");

        assert_eq!(request.path(), ["page"]);
        assert!(request.query().is_empty());
    }

    #[test]
    fn test_parse_headers() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent:   test  \r\n\r\n";
        let request = Request::parse(raw);

        assert_eq!(request.header("Host"), Some("localhost:8080"));
        assert_eq!(request.header("User-Agent"), Some("test"));
        assert_eq!(request.header("host"), None);
        assert_eq!(request.header_ignore_case("host"), Some("localhost:8080"));
    }

    #[test]
    fn test_repeated_header_overwrites() {
        let raw = b"GET / HTTP/1.1\r\nX-Tag: a\r\nX-Tag: b\r\n\r\n";
        let request = Request::parse(raw);
        assert_eq!(request.header("X-Tag"), Some("b"));
    }

    #[test]
    fn test_header_without_colon_is_ignored() {
        let raw = b"GET / HTTP/1.1\r\ngarbage line\r\nHost: h\r\n\r\n";
        let request = Request::parse(raw);

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("Host"), Some("h"));
    }

    #[test]
    fn test_bare_lf_line_endings() {
        let raw = b"GET /a?b=c HTTP/1.1\nHost: h\n\n";
        let request = Request::parse(raw);

        assert_eq!(request.path(), ["a"]);
        assert_eq!(request.header("Host"), Some("h"));
    }

    #[test]
    fn test_start_line_without_space_degrades() {
        let request = Request::parse(b"GARBAGE\r\nHost: h\r\n\r\n");

        assert_eq!(request.method(), "");
        assert_eq!(request.uri(), "");
        assert!(request.path().is_empty());
        assert_eq!(request.header("Host"), Some("h"));
    }

    #[test]
    fn test_start_line_without_version() {
        let request = Request::parse(b"GET /legacy\r\n\r\n");

        assert_eq!(request.method(), "GET");
        assert_eq!(request.uri(), "/legacy");
    }

    #[test]
    fn test_empty_input() {
        let request = Request::parse(b"");
        assert_eq!(request, Request::default());
    }

    #[test]
    fn test_leading_empty_lines_are_skipped() {
        let request = Request::parse(b"\r\n\r\nGET /x HTTP/1.1\r\n\r\n");
        assert_eq!(request.path(), ["x"]);
    }

    #[test]
    fn test_urlencoded_body() {
        let raw = b"POST /form HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\nname=John%20Doe";
        let request = Request::parse(raw);

        assert_eq!(request.form_field("name"), Some("John Doe"));
        assert_eq!(request.body(), b"name=John%20Doe");
    }

    #[test]
    fn test_urlencoded_body_with_charset() {
        let raw = b"POST /form HTTP/1.1\r\ncontent-type: Application/X-WWW-Form-Urlencoded; charset=utf-8\r\n\r\na=1&b=2";
        let request = Request::parse(raw);

        assert_eq!(request.form_field("a"), Some("1"));
        assert_eq!(request.form_field("b"), Some("2"));
    }

    #[test]
    fn test_multipart_body() {
        let raw = concat!(
            "POST /upload HTTP/1.1\r\n",
            "Content-Type: multipart/form-data; boundary=XYZ\r\n",
            "\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"f\"\r\n",
            "\r\n",
            "hello\r\n",
            "--XYZ--\r\n",
        );
        let request = Request::parse(raw.as_bytes());

        assert_eq!(request.form().len(), 1);
        assert_eq!(request.form_field("f"), Some("hello"));
    }

    #[test]
    fn test_multipart_upload_filename() {
        let raw = concat!(
            "POST /upload HTTP/1.1\r\n",
            "Content-Type: multipart/form-data; boundary=\"----b\"\r\n",
            "\r\n",
            "------b\r\n",
            "Content-Disposition: form-data; name=\"fw\"; filename=\"fw.bin\"\r\n",
            "\r\n",
            "payload\r\n",
            "------b--\r\n",
        );
        let request = Request::parse(raw.as_bytes());

        assert_eq!(request.form_field("fw"), Some("payload"));
        assert_eq!(request.filename("fw"), Some("fw.bin"));
    }

    #[test]
    fn test_multipart_without_boundary_leaves_form_empty() {
        let raw = b"POST /upload HTTP/1.1\r\nContent-Type: multipart/form-data\r\n\r\n--X\r\n\r\n";
        let request = Request::parse(raw);
        assert!(request.form().is_empty());
    }

    #[test]
    fn test_other_content_type_is_not_parsed() {
        let raw = b"POST /api HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"a\":1}";
        let request = Request::parse(raw);

        assert!(request.form().is_empty());
        assert_eq!(request.body_string().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_body_truncated_to_content_length() {
        let raw = b"POST /f HTTP/1.1\r\nContent-Length: 3\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\na=1&b=2";
        let request = Request::parse(raw);

        assert_eq!(request.body(), b"a=1");
        assert_eq!(request.form().len(), 1);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let raw = b"POST /a/b?x=1 HTTP/1.1\r\nHost: h\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\nk=v";

        assert_eq!(Request::parse(raw), Request::parse(raw));
    }

    #[test]
    fn test_set_args() {
        let mut request = Request::parse(b"GET /users/42 HTTP/1.1\r\n\r\n");
        let mut args = ParamMap::new();
        args.insert("id".to_string(), "42".to_string());
        request.set_args(args);

        assert_eq!(request.arg("id"), Some("42"));
    }

    #[test]
    fn test_read_from_transport() {
        let mut transport = MemoryTransport::new("GET /ping HTTP/1.0\r\n\r\n");
        let request = Request::read_from(&mut transport).unwrap();
        assert_eq!(request.path(), ["ping"]);
    }

    #[test]
    fn test_read_failure_propagates() {
        let mut transport = MemoryTransport::failing();
        let result = Request::read_from(&mut transport);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_param_parse_failure() {
        let request = Request::parse(b"GET /x?n=abc HTTP/1.0\r\n\r\n");
        assert_eq!(param::<u32>(request.query(), "n"), None);
    }

    #[test]
    fn test_dump_helpers() {
        let request = Request::parse(b"GET /a/b?z=1&y=2 HTTP/1.0\r\n\r\n");

        assert_eq!(dump_path("Path", request.path()), "Path : \n[\n\ta\n\tb\n]\n");
        assert_eq!(dump_params("Query", request.query()), "Query : \n{\n\ty: 2\n\tz: 1\n}\n");
    }
}

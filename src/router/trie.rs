//! # Trie de rutas
//! src/router/trie.rs
//!
//! Arena de nodos (`Vec<Branch>`) direccionados por índice; la raíz es el
//! índice 0 y representa el path vacío.
//!
//! ```text
//! (root)
//!  ├─ "users" ─┬─ "me"            leaf: me_handler
//!  │           └─ {id:\d+} ─ leaf: user_handler
//!  └─ {file}   leaf: static_handler
//! ```

use std::collections::HashMap;

use regex::Regex;

use super::pattern::Segment;
use super::{Handler, MatchMode};
use crate::error::{Error, Result};
use crate::util::ParamMap;

pub(crate) type NodeId = usize;

const ROOT: NodeId = 0;

struct ParamEdge {
    name: String,
    /// Regex tal como se escribió en el patrón
    source: String,
    /// Versión anclada (`^(?:...)$`) para match de segmento completo
    regex: Regex,
    child: NodeId,
}

#[derive(Default)]
struct Branch {
    literals: HashMap<String, NodeId>,
    /// En orden de registro
    params: Vec<ParamEdge>,
    leaf: Option<Handler>,
}

/// Segmento con su regex ya compilada
enum Step<'a> {
    Literal(&'a str),
    Param {
        name: &'a str,
        source: &'a str,
        regex: Regex,
    },
}

pub(crate) struct Trie {
    nodes: Vec<Branch>,
}

fn compile(pattern: &str, source: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})$", source)).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_step<'a>(pattern: &str, segment: &'a Segment) -> Result<Step<'a>> {
    Ok(match segment {
        Segment::Literal(text) => Step::Literal(text),
        Segment::Param { name, regex } => Step::Param {
            name,
            source: regex,
            regex: compile(pattern, regex)?,
        },
    })
}

impl Trie {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Branch::default()],
        }
    }

    /// Cantidad de nodos, raíz incluida
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self) -> NodeId {
        self.nodes.push(Branch::default());
        self.nodes.len() - 1
    }

    /// Inserta `handler` al final del camino descrito por `segments`.
    ///
    /// Todas las regex se compilan antes de tocar el trie: un patrón
    /// inválido no deja nodos a medias.
    pub(crate) fn settle(&mut self, pattern: &str, segments: &[Segment], handler: Handler) -> Result<()> {
        let compiled = segments
            .iter()
            .map(|segment| compile_step(pattern, segment))
            .collect::<Result<Vec<_>>>()?;

        let mut current = ROOT;
        for step in compiled {
            current = match step {
                Step::Literal(text) => self.literal_child(current, text),
                Step::Param { name, source, regex } => self.param_child(current, name, source, regex),
            };
        }

        if self.nodes[current].leaf.is_some() {
            tracing::warn!(pattern = %pattern, "Ruta registrada de nuevo, gana la última");
        }
        self.nodes[current].leaf = Some(handler);
        Ok(())
    }

    fn literal_child(&mut self, parent: NodeId, text: &str) -> NodeId {
        if let Some(&child) = self.nodes[parent].literals.get(text) {
            return child;
        }
        let child = self.alloc();
        self.nodes[parent].literals.insert(text.to_string(), child);
        child
    }

    /// Una entrada por par (nombre, regex) en cada nivel. El mismo nombre
    /// con otra regex abre una rama propia al final de la lista.
    fn param_child(&mut self, parent: NodeId, name: &str, source: &str, regex: Regex) -> NodeId {
        let existing = self.nodes[parent]
            .params
            .iter()
            .find(|edge| edge.name == name && edge.source == source);
        if let Some(edge) = existing {
            return edge.child;
        }

        if self.nodes[parent].params.iter().any(|edge| edge.name == name) {
            tracing::debug!(param = %name, regex = %source, "Mismo parámetro con otra regex, rama nueva");
        }

        let child = self.alloc();
        self.nodes[parent].params.push(ParamEdge {
            name: name.to_string(),
            source: source.to_string(),
            regex,
            child,
        });
        child
    }

    pub(crate) fn dispatch(&self, path: &[String], args: &mut ParamMap, mode: MatchMode) -> Option<&Handler> {
        self.dispatch_from(ROOT, path, 0, args, mode)
    }

    fn dispatch_from(
        &self,
        id: NodeId,
        path: &[String],
        pos: usize,
        args: &mut ParamMap,
        mode: MatchMode,
    ) -> Option<&Handler> {
        let branch = &self.nodes[id];

        let Some(segment) = path.get(pos) else {
            tracing::trace!(pos, "Fin del path");
            return branch.leaf.as_ref();
        };

        if let Some(&child) = branch.literals.get(segment) {
            tracing::trace!(segment = %segment, "Bajando por literal");
            if let Some(handler) = self.dispatch_from(child, path, pos + 1, args, mode) {
                return Some(handler);
            }
        }

        for edge in &branch.params {
            if !edge.regex.is_match(segment) {
                continue;
            }
            tracing::trace!(segment = %segment, param = %edge.name, regex = %edge.source, "Match de regex");
            args.insert(edge.name.clone(), segment.clone());
            if let Some(handler) = self.dispatch_from(edge.child, path, pos + 1, args, mode) {
                return Some(handler);
            }
        }

        match mode {
            // El prefijo consumido hasta aquí responde con su propio leaf
            MatchMode::Fallback => branch.leaf.as_ref(),
            MatchMode::Strict => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::pattern::parse_pattern;
    use std::sync::Arc;

    fn noop() -> Handler {
        Arc::new(|_: &crate::http::Request, _: &mut crate::http::ResponseWriter<'_>| {})
    }

    #[test]
    fn test_new_trie_has_root() {
        assert_eq!(Trie::new().len(), 1);
    }

    #[test]
    fn test_shared_prefix_reuses_nodes() {
        let mut trie = Trie::new();
        trie.settle("/a/b", &parse_pattern("/a/b"), noop()).unwrap();
        trie.settle("/a/c", &parse_pattern("/a/c"), noop()).unwrap();

        // root, a, b, c
        assert_eq!(trie.len(), 4);
    }

    #[test]
    fn test_same_param_name_reuses_child() {
        let mut trie = Trie::new();
        trie.settle("/u/{id}/x", &parse_pattern("/u/{id}/x"), noop()).unwrap();
        trie.settle("/u/{id}/y", &parse_pattern("/u/{id}/y"), noop()).unwrap();

        // root, u, {id}, x, y
        assert_eq!(trie.len(), 5);
    }

    #[test]
    fn test_same_name_other_regex_gets_own_child() {
        let mut trie = Trie::new();
        trie.settle("/{id:\\d+}", &parse_pattern("/{id:\\d+}"), noop()).unwrap();
        trie.settle("/{id:[a-z]+}", &parse_pattern("/{id:[a-z]+}"), noop()).unwrap();
        trie.settle("/{id:\\d+}", &parse_pattern("/{id:\\d+}"), noop()).unwrap();

        // root, {id:\d+}, {id:[a-z]+}
        assert_eq!(trie.len(), 3);
    }

    #[test]
    fn test_invalid_regex_leaves_trie_untouched() {
        let mut trie = Trie::new();
        let result = trie.settle("/a/{x:(}", &parse_pattern("/a/{x:(}"), noop());

        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn test_regex_is_anchored() {
        let mut trie = Trie::new();
        trie.settle("/{n:\\d+}", &parse_pattern("/{n:\\d+}"), noop()).unwrap();

        let mut args = ParamMap::new();
        let path = vec!["a12b".to_string()];
        assert!(trie.dispatch(&path, &mut args, MatchMode::Strict).is_none());
    }

    #[test]
    fn test_args_capture_whole_segment() {
        let mut trie = Trie::new();
        trie.settle("/v/{ver:v(\\d)}", &parse_pattern("/v/{ver:v(\\d)}"), noop()).unwrap();

        let mut args = ParamMap::new();
        let path = vec!["v".to_string(), "v2".to_string()];
        assert!(trie.dispatch(&path, &mut args, MatchMode::Strict).is_some());
        assert_eq!(args["ver"], "v2");
    }
}

//! Text templates with named slots, the foundation of shader generation.
//!
//! A slot is written `{name}` where `name` is an ASCII identifier. Any other
//! brace sequence (GLSL blocks, `{ x + 1 }`, a lone `{`) is ordinary text and
//! passes through untouched, so GLSL bodies can be stored verbatim. Matching
//! is a deterministic single-pass scan; there is no escaping and no regex.

use std::collections::HashMap;

use anyhow::{Result, bail};

/// An immutable piece of text containing zero or more named slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    text: String,
}

enum Piece<'a> {
    Text(&'a str),
    Slot(&'a str),
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split `text` into literal runs and slot names, left to right.
fn pieces(text: &str) -> Vec<Piece<'_>> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let mut j = i + 1;
            if j < bytes.len() && is_ident_start(bytes[j]) {
                j += 1;
                while j < bytes.len() && is_ident_continue(bytes[j]) {
                    j += 1;
                }
                if j < bytes.len() && bytes[j] == b'}' {
                    if start < i {
                        out.push(Piece::Text(&text[start..i]));
                    }
                    out.push(Piece::Slot(&text[i + 1..j]));
                    i = j + 1;
                    start = i;
                    continue;
                }
            }
        }
        i += 1;
    }
    if start < text.len() {
        out.push(Piece::Text(&text[start..]));
    }
    out
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Slot names in order of first appearance, deduplicated.
    pub fn slots(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for piece in pieces(&self.text) {
            if let Piece::Slot(name) = piece {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Replace every occurrence of each bound slot. Slots without a binding
    /// are kept verbatim so substitutions can be chained.
    pub fn substitute(&self, bindings: &HashMap<String, String>) -> Template {
        let mut out = String::with_capacity(self.text.len());
        for piece in pieces(&self.text) {
            match piece {
                Piece::Text(t) => out.push_str(t),
                Piece::Slot(name) => match bindings.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        Template { text: out }
    }

    /// Final emission. Errors if any slot is still unresolved; an unresolved
    /// slot in a merged shader is a transpilation error, not a broken program.
    pub fn finish(&self) -> Result<String> {
        let unresolved = self.slots();
        if !unresolved.is_empty() {
            bail!("unresolved template slots: {}", unresolved.join(", "));
        }
        Ok(self.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_every_occurrence() {
        let t = Template::new("vec3 a = {x}; vec3 b = {x} + {y};");
        let out = t.substitute(&bindings(&[("x", "6.28"), ("y", "1.0")]));
        assert_eq!(out.text(), "vec3 a = 6.28; vec3 b = 6.28 + 1.0;");
    }

    #[test]
    fn no_matching_slot_is_a_noop() {
        let t = Template::new("float q = 2.0;");
        let out = t.substitute(&bindings(&[("x", "6.28")]));
        assert_eq!(out.text(), t.text());
    }

    #[test]
    fn glsl_blocks_are_not_slots() {
        let t = Template::new("void main() {\n    float {v} = 1.0;\n}\n");
        assert_eq!(t.slots(), vec!["v"]);
        let out = t.substitute(&bindings(&[("v", "n0_v")]));
        assert_eq!(out.text(), "void main() {\n    float n0_v = 1.0;\n}\n");
    }

    #[test]
    fn unbound_slots_survive_for_chaining() {
        let t = Template::new("{a} {b}");
        let once = t.substitute(&bindings(&[("a", "1")]));
        assert_eq!(once.text(), "1 {b}");
        let twice = once.substitute(&bindings(&[("b", "2")]));
        assert_eq!(twice.finish().unwrap(), "1 2");
    }

    #[test]
    fn finish_rejects_unresolved_slots() {
        let err = Template::new("{a} + {b}").finish().unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("a"), "{msg}");
        assert!(msg.contains("b"), "{msg}");
    }

    #[test]
    fn slot_must_be_a_bare_identifier() {
        assert!(Template::new("{ spaced }").slots().is_empty());
        assert!(Template::new("{1abc}").slots().is_empty());
        assert!(Template::new("{}").slots().is_empty());
        assert_eq!(Template::new("{_ok2}").slots(), vec!["_ok2"]);
    }

    proptest! {
        #[test]
        fn substitution_matches_plain_string_replace(
            name in "[a-z][a-z0-9_]{0,8}",
            value in "[^{}]{0,16}",
            prefix in "[^{}]{0,16}",
            infix in "[^{}]{0,16}",
            suffix in "[^{}]{0,16}",
        ) {
            let source = format!("{prefix}{{{name}}}{infix}{{{name}}}{suffix}");
            let t = Template::new(source.clone());
            let out = t.substitute(&bindings(&[(name.as_str(), value.as_str())]));
            prop_assert_eq!(out.text(), source.replace(&format!("{{{name}}}"), &value));
        }
    }
}

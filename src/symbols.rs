//! Symbol table shared by every subsystem
//!
//! Maps symbolic names (single characters and multi-character symbols) to the
//! integer labels carried on automaton arcs. A handful of low codes are
//! reserved for epsilon, the two wildcard symbols and the internal markers
//! used by the rule compiler; those never appear in user-visible lookups.

use std::collections::HashMap;

/// Integer code carried on automaton arcs.
///
/// Negative labels are production references used by the grammar linker.
pub type Label = i32;

/// The empty string.
pub const EPSILON: Label = 0;
/// Any symbol outside the automaton's sigma, mapped to itself.
pub const IDENTITY: Label = 1;
/// Any symbol outside the automaton's sigma. Paired with itself it denotes
/// two *different* unknown symbols.
pub const UNKNOWN: Label = 2;
/// Word boundary (`#` in rule contexts).
pub const WORD_BOUNDARY: Label = 3;
/// Delimiter used by the restriction construction.
pub const RESTRICT_DELIM: Label = 4;
/// Opens a rewritten span in rule compilation.
pub const INSIDE_OPEN: Label = 5;
/// Closes a rewritten span in rule compilation.
pub const INSIDE_CLOSE: Label = 6;
/// First code handed out to user symbols.
pub const FIRST_USER: Label = 16;

/// True for the reserved marker codes (boundary, delimiter, span brackets).
pub fn is_marker(label: Label) -> bool {
    (WORD_BOUNDARY..=INSIDE_CLOSE).contains(&label)
}

/// True for the two wildcard codes.
pub fn is_wildcard(label: Label) -> bool {
    label == IDENTITY || label == UNKNOWN
}

/// True for labels that belong in an automaton's sigma.
pub fn is_sigma_label(label: Label) -> bool {
    label >= WORD_BOUNDARY
}

/// Bidirectional name/code mapping.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    codes: HashMap<String, Label>,
    /// Multi-character symbols, longest first, for greedy tokenization.
    multichar: Vec<String>,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code for `name`, allocating one if needed.
    pub fn intern(&mut self, name: &str) -> Label {
        if let Some(&code) = self.codes.get(name) {
            return code;
        }
        let code = FIRST_USER + self.names.len() as Label;
        self.names.push(name.to_string());
        self.codes.insert(name.to_string(), code);
        if name.chars().count() > 1 {
            self.multichar.push(name.to_string());
            self.multichar
                .sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        }
        code
    }

    /// Look up an existing user symbol.
    pub fn code(&self, name: &str) -> Option<Label> {
        self.codes.get(name).copied()
    }

    /// Name of a user symbol. Reserved codes have no user-visible name.
    pub fn name(&self, code: Label) -> Option<&str> {
        if code < FIRST_USER {
            return None;
        }
        self.names
            .get((code - FIRST_USER) as usize)
            .map(String::as_str)
    }

    /// Printable rendering of any label, reserved codes included.
    pub fn display(&self, code: Label) -> String {
        match code {
            EPSILON => String::new(),
            IDENTITY => ".".to_string(),
            UNKNOWN => "?".to_string(),
            WORD_BOUNDARY => "#".to_string(),
            RESTRICT_DELIM => "<D>".to_string(),
            INSIDE_OPEN => "<[".to_string(),
            INSIDE_CLOSE => "]>".to_string(),
            c if c < 0 => format!("<ref{}>", -c),
            c => match self.name(c) {
                Some(name) if name.chars().count() > 1 => format!("'{}'", name),
                Some(name) => name.to_string(),
                None => format!("<{}>", c),
            },
        }
    }

    /// Render a label sequence, skipping epsilons.
    pub fn render(&self, labels: &[Label]) -> String {
        labels
            .iter()
            .filter(|&&l| l != EPSILON)
            .map(|&l| self.display(l))
            .collect()
    }

    /// Split text into symbols, preferring the longest known multi-character
    /// symbol at each position. Unknown characters are interned.
    pub fn tokenize(&mut self, text: &str) -> Vec<Label> {
        let mut labels = Vec::new();
        let mut rest = text;
        'outer: while !rest.is_empty() {
            for symbol in &self.multichar {
                if rest.starts_with(symbol.as_str()) {
                    let code = self.codes[symbol];
                    labels.push(code);
                    rest = &rest[symbol.len()..];
                    continue 'outer;
                }
            }
            let mut chars = rest.chars();
            if let Some(ch) = chars.next() {
                let mut buf = [0u8; 4];
                labels.push(self.intern(ch.encode_utf8(&mut buf)));
            }
            rest = chars.as_str();
        }
        labels
    }

    /// Number of user symbols.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no user symbol has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let mut table = SymbolTable::new();
        let a = table.intern("a");
        let noun = table.intern("[Noun]");
        assert_eq!(table.intern("a"), a);
        assert_eq!(table.name(noun), Some("[Noun]"));
        assert!(a >= FIRST_USER);
    }

    #[test]
    fn reserved_codes_are_hidden() {
        let table = SymbolTable::new();
        assert_eq!(table.name(WORD_BOUNDARY), None);
        assert_eq!(table.code("#"), None);
        assert_eq!(table.display(WORD_BOUNDARY), "#");
    }

    #[test]
    fn tokenize_prefers_longest_multichar_symbol() {
        let mut table = SymbolTable::new();
        let ab = table.intern("ab");
        let abc = table.intern("abc");
        let labels = table.tokenize("abcab");
        assert_eq!(labels, vec![abc, ab]);
        let x = table.code("x");
        assert!(x.is_none());
        let labels = table.tokenize("xa");
        assert_eq!(labels.len(), 2);
        assert_eq!(table.name(labels[1]), Some("a"));
    }
}

use indexmap::IndexSet;

/// Handle to an interned string. Tokens and AST nodes carry symbols
/// instead of owned text, so identifiers, raw lexemes, and captured
/// block bodies stay `Copy`-friendly across the whole compile.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Symbol(u32);

impl Symbol {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fixed spellings the scanner pushes as the lexeme of every operator
/// and punctuation token (plus the collapsed newline and the empty
/// EOF lexeme). Seeding them keeps the scanner's hot path a pure hash
/// probe and pins each spelling to a stable low index.
const SEED_LEXEMES: &[&str] = &[
    "", "\n", "+", "+=", "-", "->", "-=", "*", "**", "*=", "/", "/=", "%",
    "=", "==", "=>", "!", "!=", "<", "<=", "<<", ">", ">=", ">>", "&&",
    "||", "|", "~", "~>", "?", ":", "::", ";", ",", ".", "..", "...", "(",
    ")", "{", "}", "[", "]",
];

/// String interner shared by the scanner, parser, and emitter of one
/// compile. Insertion order is the symbol: an `IndexSet` gives both the
/// dedup lookup and the index→text direction from a single store.
pub struct Interner {
    strings: IndexSet<Box<str>>,
}

impl Interner {
    pub fn new() -> Self {
        let mut strings = IndexSet::with_capacity(SEED_LEXEMES.len() + 64);
        for lexeme in SEED_LEXEMES {
            strings.insert(Box::from(*lexeme));
        }
        Interner { strings }
    }

    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(index) = self.strings.get_index_of(text) {
            return Symbol(index as u32);
        }
        let (index, _) = self.strings.insert_full(Box::from(text));
        Symbol(index as u32)
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.strings
            .get_index(sym.index())
            .map(|s| &**s)
            .unwrap_or("")
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

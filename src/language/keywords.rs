//! Reserved words and built-ins of the Midori language

/// Reserved keywords, sorted
pub const KEYWORDS: &[&str] = &[
    "await", "break", "continue", "else", "enum", "error", "extern", "false", "fn", "for", "if",
    "impl", "import", "in", "let", "loop", "match", "module", "pub", "return", "spawn", "struct",
    "task", "trait", "true", "unsafe", "use", "var", "while",
];

/// Built-in type names offered by completion
pub const BUILTIN_TYPES: &[&str] = &[
    "Int", "Float", "Bool", "Char", "String", "Void", "Option", "Result",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

/// Documentation entry for a keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordDoc {
    pub keyword: &'static str,
    pub doc: &'static str,
}

const KEYWORD_DOCS: &[KeywordDoc] = &[
    KeywordDoc { keyword: "await", doc: "Suspends until the awaited task completes." },
    KeywordDoc { keyword: "break", doc: "Exits the innermost loop, optionally with a value." },
    KeywordDoc { keyword: "continue", doc: "Skips to the next iteration of the innermost loop." },
    KeywordDoc { keyword: "else", doc: "Alternative branch of an `if` expression." },
    KeywordDoc { keyword: "enum", doc: "Declares a sum type: `enum Shape { Circle(r: Float), Empty }`." },
    KeywordDoc { keyword: "error", doc: "Declares a custom error type: `error NotFound`." },
    KeywordDoc { keyword: "extern", doc: "Declares a foreign function: `extern \"C\" fn puts(s: String) -> Int`." },
    KeywordDoc { keyword: "false", doc: "Boolean literal." },
    KeywordDoc { keyword: "fn", doc: "Declares a function: `fn add(a: Int, b: Int) -> Int { a + b }`." },
    KeywordDoc { keyword: "for", doc: "Iterates over a range or collection: `for i in 0..10 { ... }`." },
    KeywordDoc { keyword: "if", doc: "Conditional expression; both branches must have the same type." },
    KeywordDoc { keyword: "impl", doc: "Reserved for trait implementations." },
    KeywordDoc { keyword: "import", doc: "Imports another source file: `import \"./util.mdr\"`." },
    KeywordDoc { keyword: "in", doc: "Separates the binding from the iterable in a `for` loop." },
    KeywordDoc { keyword: "let", doc: "Declares an immutable binding: `let x := 1` or `let x: Int = 1`." },
    KeywordDoc { keyword: "loop", doc: "Repeats a block until `break`." },
    KeywordDoc { keyword: "match", doc: "Pattern matches a value against arms." },
    KeywordDoc { keyword: "module", doc: "Reserved for module declarations." },
    KeywordDoc { keyword: "pub", doc: "Marks a declaration as public." },
    KeywordDoc { keyword: "return", doc: "Returns from the enclosing function." },
    KeywordDoc { keyword: "spawn", doc: "Starts a task concurrently." },
    KeywordDoc { keyword: "struct", doc: "Declares a record type: `struct User { id: Int, name: String }`." },
    KeywordDoc { keyword: "task", doc: "Marks a function as an asynchronous task." },
    KeywordDoc { keyword: "trait", doc: "Declares a set of method signatures." },
    KeywordDoc { keyword: "true", doc: "Boolean literal." },
    KeywordDoc { keyword: "unsafe", doc: "Opens a block that may perform unchecked operations." },
    KeywordDoc { keyword: "use", doc: "Reserved for module imports." },
    KeywordDoc { keyword: "var", doc: "Declares a mutable binding: `var count := 0`." },
    KeywordDoc { keyword: "while", doc: "Repeats a block while a condition holds." },
];

pub fn keyword_doc(word: &str) -> Option<&'static KeywordDoc> {
    KEYWORD_DOCS.iter().find(|k| k.keyword == word)
}

/// A compiler-provided function or constructor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub signature: &'static str,
    pub params: &'static [(&'static str, &'static str)],
    pub doc: &'static str,
}

impl Builtin {
    pub fn param_labels(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|(name, ty)| format!("{}: {}", name, ty))
            .collect()
    }
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "print",
        signature: "fn print(value: Any) -> Void",
        params: &[("value", "Any")],
        doc: "Writes a value followed by a newline to standard output.",
    },
    Builtin {
        name: "Some",
        signature: "fn Some(value: T) -> Option[T]",
        params: &[("value", "T")],
        doc: "Wraps a present value in an `Option`.",
    },
    Builtin {
        name: "None",
        signature: "None: Option[T]",
        params: &[],
        doc: "The absent `Option` value.",
    },
    Builtin {
        name: "Ok",
        signature: "fn Ok(value: T) -> Result[T, E]",
        params: &[("value", "T")],
        doc: "Successful `Result` value.",
    },
    Builtin {
        name: "Err",
        signature: "fn Err(error: E) -> Result[T, E]",
        params: &[("error", "E")],
        doc: "Failed `Result` value; propagate with `?`.",
    },
];

pub fn builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

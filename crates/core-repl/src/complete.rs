//! C-aware tab completion.
//!
//! Right after the command sigil the command letters are offered. Otherwise
//! the identifier left of the cursor is completed from static tables; each
//! table has its own suffix so accepting `printf` yields `printf(` and
//! accepting `break` yields `break;`. Preprocessor lines only complete
//! directive names.

use crate::driver::{COMMAND_SIGIL, PREPROCESSOR_SIGIL};
use core_editor::{Completer, Completions};

const DIRECTIVES: &[&str] = &[
    "define", "undef", "if", "ifdef", "ifndef", "else", "elif", "endif", "include", "embed",
    "line", "error", "pragma",
];

const KEYWORDS: &[&str] = &[
    "if", "else", "for", "do", "while", "switch", "case", "default", "return", "goto", "auto",
];

const STATEMENT_LIKE: &[&str] = &["break", "continue"];

const TYPE_LIKE: &[&str] = &[
    "int", "char", "float", "double", "void", "short", "long", "signed", "unsigned", "struct",
    "union", "enum", "const", "volatile", "static", "extern", "register", "inline", "restrict",
    "bool", "size_t", "ssize_t", "wchar_t", "int8_t", "int16_t", "int32_t", "int64_t", "uint8_t",
    "uint16_t", "uint32_t", "uint64_t", "intmax_t", "intptr_t", "uintmax_t", "uintptr_t", "ONCE",
];

const FUNCTION_LIKE: &[&str] = &[
    "printf", "scanf", "malloc", "free", "realloc", "calloc", "memcpy", "memset", "puts",
    "putchar", "atoi", "atol", "atoll", "strtol", "strtoll", "strtoul", "strtoull", "strcpy",
    "strncpy", "strlen", "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "exp", "pow",
    "log", "sqrt", "cbrt", "lgamma", "tgamma", "abs", "labs", "llabs", "fabs", "fmod", "fmin",
    "fmax", "ceil", "floor", "round", "trunc", "INT8_C", "INT16_C", "INT32_C", "INT64_C",
    "UINT8_C", "UINT16_C", "UINT32_C", "UINT64_C", "sizeof", "alignof", "alignas", "PRINT",
    "BIN", "WPRINT",
];

const CONSTANT_LIKE: &[&str] = &[
    "NULL", "true", "false", "SIZE_MAX", "WCHAR_MAX", "WCHAR_MIN", "CHAR_BIT", "SCHAR_MAX",
    "SCHAR_MIN", "UCHAR_MAX", "INT8_MAX", "INT16_MAX", "INT32_MAX", "INT64_MAX", "INT8_MIN",
    "INT16_MIN", "INT32_MIN", "INT64_MIN", "UINT8_MAX", "UINT16_MAX", "UINT32_MAX", "UINT64_MAX",
    "PRId8", "PRId16", "PRId32", "PRId64", "PRIdPTR", "PRIu8", "PRIu16", "PRIu32", "PRIu64",
    "PRIuPTR", "PRIx8", "PRIx16", "PRIx32", "PRIx64", "PRIxPTR", "SCNd8", "SCNd16", "SCNd32",
    "SCNd64", "SCNdPTR", "SCNu8", "SCNu16", "SCNu32", "SCNu64", "SCNuPTR", "SCNx8", "SCNx16",
    "SCNx32", "SCNx64", "SCNxPTR", "FLT_MAX", "FLT_MIN", "DBL_MAX", "DBL_MIN", "LDBL_MAX",
    "LDBL_MIN", "FLT_EPSILON", "DBL_EPSILON", "LDBL_EPSILON",
];

const COMMAND_LETTERS: &str = "qhflpPmt;";

#[derive(Debug, Clone, Copy, Default)]
pub struct CCompleter;

fn add_matches(out: &mut Completions, table: &[&str], prefix: &str, suffix: &str) {
    for word in table.iter().filter(|w| w.starts_with(prefix)) {
        out.add(format!("{word}{suffix}"), *word);
    }
}

/// Candidates for `line` with the cursor at codepoint offset `cursor`.
pub fn complete_c(line: &str, cursor: usize) -> Completions {
    let chars: Vec<char> = line.chars().collect();
    let cursor = cursor.min(chars.len());

    if cursor == 1 && chars.first() == Some(&COMMAND_SIGIL) {
        let mut out = Completions::at(1);
        for letter in COMMAND_LETTERS.chars() {
            out.add(letter.to_string(), letter.to_string());
        }
        return out;
    }

    let start = chars[..cursor]
        .iter()
        .rposition(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map_or(0, |i| i + 1);
    let mut out = Completions::at(start);
    if start == cursor {
        return out;
    }
    let prefix: String = chars[start..cursor].iter().collect();

    if line.trim_start().starts_with(PREPROCESSOR_SIGIL) {
        add_matches(&mut out, DIRECTIVES, &prefix, " ");
    } else {
        add_matches(&mut out, KEYWORDS, &prefix, " ");
        add_matches(&mut out, STATEMENT_LIKE, &prefix, ";");
        add_matches(&mut out, TYPE_LIKE, &prefix, " ");
        add_matches(&mut out, FUNCTION_LIKE, &prefix, "(");
        add_matches(&mut out, CONSTANT_LIKE, &prefix, "");
    }
    out
}

impl Completer for CCompleter {
    fn complete(&self, line: &str, cursor: usize) -> Completions {
        complete_c(line, cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replacements(c: &Completions) -> Vec<&str> {
        c.candidates.iter().map(|c| c.replacement.as_str()).collect()
    }

    #[test]
    fn command_letters_after_sigil() {
        let c = complete_c(";", 1);
        assert_eq!(c.start, 1);
        assert_eq!(replacements(&c), vec!["q", "h", "f", "l", "p", "P", "m", "t", ";"]);
    }

    #[test]
    fn suffix_depends_on_table() {
        let c = complete_c("x = pri", 7);
        assert_eq!(c.start, 4);
        assert_eq!(replacements(&c), vec!["printf("]);
        assert_eq!(replacements(&complete_c("bre", 3)), vec!["break;"]);
        assert_eq!(replacements(&complete_c("NU", 2)), vec!["NULL"]);
        assert_eq!(replacements(&complete_c("uint8", 5)), vec!["uint8_t "]);
    }

    #[test]
    fn directive_lines_use_directive_table() {
        let c = complete_c("  #inc", 6);
        assert_eq!(c.start, 3);
        assert_eq!(replacements(&c), vec!["include "]);
        assert!(complete_c("#pr", 3).candidates.iter().all(|c| c.display == "pragma"));
    }

    #[test]
    fn empty_word_offers_nothing() {
        assert!(complete_c("x + ", 4).is_empty());
        assert!(complete_c("", 0).is_empty());
    }

    #[test]
    fn prefix_is_case_sensitive_and_mid_line() {
        let c = complete_c("wh) + 1", 2);
        assert_eq!(c.start, 0);
        assert_eq!(replacements(&c), vec!["while "]);
    }
}

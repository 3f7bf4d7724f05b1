//! Translation-unit synthesis.
//!
//! Layout of a synthesized unit, in order:
//!
//! ```text
//! standard includes
//! preamble            (committed top-level fragments)
//! first               (this round's top-level fragment)
//! prologue            (#line 1 "nowhere", print helpers, ONCE, PRINT, ...)
//! #define LASTLINE n
//! body                (committed statements)
//! last                (this round's statement or synthesized call)
//! epilogue            (return 0; })
//! ```
//!
//! Every user fragment starts with `#line N "<string>"` so diagnostics point
//! at REPL line numbers. `LASTLINE` holds the last committed line, which lets
//! `ONCE` and the patched `printf`/`puts`/`putchar` stay quiet when earlier
//! statements are re-run.
//!
//! Everything here is pure string building.

use crate::scanner::ends_in_line_comment;
use std::fmt::Write as _;

/// Platform flavour of the generated C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Unix,
    Windows,
}

impl Target {
    pub fn host() -> Self {
        if cfg!(windows) {
            Target::Windows
        } else {
            Target::Unix
        }
    }
}

/// File name used in line markers for user code.
pub const SOURCE_NAME: &str = "<string>";
/// File name used for the prologue, so diagnostics in it are recognisable.
pub const PROLOGUE_NAME: &str = "nowhere";

const INCLUDES: &str = "#include <stdio.h>\n\
#include <stdlib.h>\n\
#include <string.h>\n\
#include <stdbool.h>\n\
#include <stdalign.h>\n\
#include <math.h>\n\
#include <inttypes.h>\n\
#include <float.h>\n\
#include <wchar.h>\n";

const EPILOGUE: &str = "return 0;\n}\n";

/// `#line N "<string>"` plus newline.
pub fn line_marker(line: usize) -> String {
    format!("#line {line} \"{SOURCE_NAME}\"\n")
}

/// The two per-round fragments: `first` lands before the prologue (file
/// scope), `last` after the committed body (inside `ic_main`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragments {
    pub first: String,
    pub last: String,
}

impl Fragments {
    /// A statement typed at logical line `line + 1`.
    pub fn statement(line: usize, text: &str) -> Self {
        Self {
            first: String::new(),
            last: line_marker(line + 1) + text,
        }
    }

    /// An expression: wrapped in `PRINT((...))`, never committed.
    pub fn expression(line: usize, text: &str) -> Self {
        let expr = text.strip_suffix('\n').unwrap_or(text);
        let close = if ends_in_line_comment(text) { "\n" } else { "" };
        Self {
            first: String::new(),
            last: format!("{}PRINT(({expr}{close}));\n", line_marker(line + 1)),
        }
    }

    /// A preprocessor or `;f` top-level unit.
    pub fn top_level(line: usize, text: &str) -> Self {
        Self {
            first: line_marker(line + 1) + text,
            last: String::new(),
        }
    }

    /// `;p expr`: hexdump the object `expr`.
    pub fn object_dump(line: usize, expr: &str) -> Self {
        Self {
            first: String::new(),
            last: format!(
                "{}__printmem(&({expr}),sizeof({expr}));\n",
                line_marker(line + 1)
            ),
        }
    }

    /// `;P ptr,size`: hexdump `size` bytes at `ptr`.
    pub fn memory_dump(line: usize, args: &str) -> Self {
        Self {
            first: String::new(),
            last: format!("{}__printmem({args});\n", line_marker(line + 1)),
        }
    }

    /// `;m expr`: print the macro expansion of `expr`.
    pub fn macro_expansion(line: usize, expr: &str) -> Self {
        Self {
            first: String::new(),
            last: format!(
                "{}printf(\"%s\\n\", __IC_STRINGIFY({expr}));\n",
                line_marker(line + 1)
            ),
        }
    }
}

fn bin_function(out: &mut String, bits: u32) {
    let _ = writeln!(
        out,
        "char *__bin{bits}(int{bits}_t x) {{static char b[{bits}+{bits}/4] = {{0}};int o = 0;\
for (int i = 0; i<{bits}; ++i) {{if (i>0 && i%4==0) b[o++] = '_';b[o++] = x<0?'1':'0'; x <<= 1;}}\
b[o] = 0; return b;}}"
    );
}

fn patch(out: &mut String, func: &str) {
    let _ = writeln!(
        out,
        "#define {func}(...) do {{if (__LINE__>LASTLINE) {func}(__VA_ARGS__);}} while(0)"
    );
}

const CHAR_ESCAPES: [(&str, &str); 7] = [
    ("\\a", "\\\\a"),
    ("\\b", "\\\\b"),
    ("\\f", "\\\\f"),
    ("\\n", "\\\\n"),
    ("\\r", "\\\\r"),
    ("\\t", "\\\\t"),
    ("\\v", "\\\\v"),
];

fn char_cases(out: &mut String, prefix: &str) {
    let _ = write!(
        out,
        "case 34:case 39:case 92: printf(\"{prefix}'\\\\%c'\",x); break;"
    );
    for (lit, shown) in CHAR_ESCAPES {
        let _ = write!(out, "case '{lit}': printf(\"{prefix}'{shown}'\"); break;");
    }
}

const FIXED_PRINTERS: &str = r##"void __printi8(int8_t x) {printf("(int8_t) %"PRId8" = 0x%02"PRIX8"\n",x,(uint8_t)x);}
void __printi16(int16_t x) {printf("(int16_t) %"PRId16" = 0x%04"PRIX16"\n",x,(uint16_t)x);}
"##;

const WIDE_PRINTERS: &str = r##"void __printi64(int64_t x) {printf("(int64_t) %"PRId64" = 0x%016"PRIX64"\n",x,x);}
void __printu8(uint8_t x) {printf("(uint8_t) %"PRIu8" = 0x%02"PRIX8"\n",x,x);}
void __printu16(uint16_t x) {printf("(uint16_t) %"PRIu16" = 0x%04"PRIX16"\n",x,x);}
void __printu32(uint32_t x) {printf("(uint32_t) %"PRIu32" = 0x%08"PRIX32"\n",x,x);}
void __printu64(uint64_t x) {printf("(uint64_t) %"PRIu64" = 0x%016"PRIX64"\n",x,x);}
"##;

const LONG_PRINTERS_WINDOWS: &str = r##"void __printil(long x) {printf("(long) %ld = ",x);if (4==sizeof(long)) printf("0x%08lX\n",x);else printf("0x%016lX\n",x);}
void __printul(unsigned long x) {printf("(unsigned long) %lu = ",x);if (4==sizeof(long)) printf("0x%08lX\n",x);else printf("0x%016lX\n",x);}
"##;

const LONG_PRINTERS_UNIX: &str = r##"void __printill(long long x) {printf("(long long) %lld = ",x);if (8==sizeof(long long)) printf("0x%016llX\n",x);else printf("0x%08llX\n",x);}
void __printull(unsigned long long x) {printf("(unsigned long long) %llu = ",x);if (8==sizeof(unsigned long long)) printf("0x%016llX\n",x);else printf("0x%08llX\n",x);}
"##;

const FLOAT_PRINTERS: &str = r##"void __printf32(float x) {printf("(float) %g\n",x);}
void __printf64(double x) {printf("(double) %g\n",x);}
void __printld(long double x) {printf("(long double) %Lg\n",x);}
void __printb(_Bool x) {printf("%s\n",x?"true":"false");}
"##;

const STRING_PRINTERS: &str = r##"void __prints(char *x) {printf("%s\n",x);}
void __printcs(char const*x) {printf("%s\n",x);}
void __printwc(wchar_t x) {printf("%lc\n",x);}
void __printws(wchar_t *x) {printf("%ls\n",x);}
void __printwcs(wchar_t const*x) {printf("%ls\n",x);}
"##;

const PRINTMEM: &str = r##"void __printmem(void *x, size_t sz) {size_t i, j, k; uint8_t *a = x;puts("Offset(h)  00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f  Decoded Text");for (i = 0; i<sz; ++i) {if (i%16==0) printf("%09zx  ", i);printf("%02x ", a[i]);if ((i+1)%16==0) {printf(" ");for (j = 16*(i/16); j<=i; ++j)if (a[j]<=126 && a[j]>=33) printf("%c",a[j]); else printf(".");puts("");}}if ((k = i%16)!=0) {for (j = 0; j<16-k; ++j) printf("   "); printf(" ");for (j = i-k; j<i; ++j)if (a[j]<=126 && a[j]>=33) printf("%c",a[j]); else printf(".");puts("");}}
"##;

const MACROS: &str = r##"#define __IC_STRINGIFY1(...) #__VA_ARGS__
#define __IC_STRINGIFY(...) __IC_STRINGIFY1(__VA_ARGS__)
#define ONCE_LINE (__LINE__>LASTLINE)
#define ONCE if (__LINE__>LASTLINE)
"##;

/// Builds translation units for one target.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    target: Target,
    prologue: String,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(Target::host())
    }
}

impl Synthesizer {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            prologue: build_prologue(target),
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn prologue(&self) -> &str {
        &self.prologue
    }

    /// Assemble the full unit. Deterministic for identical inputs.
    pub fn synthesize(
        &self,
        line: usize,
        preamble: &str,
        first: &str,
        body: &str,
        last: &str,
    ) -> String {
        let mut out = String::with_capacity(
            INCLUDES.len()
                + self.prologue.len()
                + preamble.len()
                + first.len()
                + body.len()
                + last.len()
                + 64,
        );
        out.push_str(INCLUDES);
        out.push_str(preamble);
        out.push_str(first);
        out.push_str(&self.prologue);
        let _ = writeln!(out, "#define LASTLINE {line}");
        out.push_str(body);
        out.push_str(last);
        out.push_str(EPILOGUE);
        out
    }

    /// `;t` fragments: a clock include and printer at file scope, and the
    /// measured statement (repeated `reps` times when given) in `last`.
    pub fn timing(&self, line: usize, reps: Option<&str>, statement: &str) -> Fragments {
        let windows = self.target == Target::Windows;
        let mut first = String::from(if windows {
            "#include <windows.h>\n"
        } else {
            "#include <time.h>\n"
        });
        first.push_str(
            "static void __icPrintTime(double ns) {\
if      (ns<1e3) printf(\"%.5gns\\n\", ns);\
else if (ns<1e6) printf(\"%.4gus\\n\", ns/1e3);\
else if (ns<1e9) printf(\"%.4gms\\n\", ns/1e6);\
else             printf(\"%.5gs\\n\", ns/1e9);}\n",
        );

        let mut last = line_marker(line + 1);
        if windows {
            last.push_str("LARGE_INTEGER __icFreq, __icStart, __icEnd;\n");
            last.push_str("QueryPerformanceFrequency(&__icFreq);\n");
            last.push_str("QueryPerformanceCounter(&__icStart);\n");
        } else {
            last.push_str("struct timespec __icStart, __icEnd;\n");
            last.push_str("clock_gettime(CLOCK_MONOTONIC, &__icStart);\n");
        }
        if let Some(n) = reps {
            let _ = writeln!(last, "uint64_t __icReps = ({n});");
            last.push_str("for (uint64_t __icI = 0; __icI<__icReps; ++__icI) {\n");
        }
        last.push_str(statement);
        if reps.is_some() {
            last.push_str("}\n");
        }
        if windows {
            last.push_str("QueryPerformanceCounter(&__icEnd);\n");
            last.push_str(
                "double __icTimeNs = 1e9 * (__icEnd.QuadPart - __icStart.QuadPart) / __icFreq.QuadPart;\n",
            );
        } else {
            last.push_str("clock_gettime(CLOCK_MONOTONIC, &__icEnd);\n");
            last.push_str(
                "double __icTimeNs = 1e9 * (__icEnd.tv_sec - __icStart.tv_sec) + (__icEnd.tv_nsec - __icStart.tv_nsec);\n",
            );
        }
        last.push_str("printf(\"Elapsed time: \");__icPrintTime(__icTimeNs);\n");
        if reps.is_some() {
            last.push_str("printf(\"Average time: \");__icPrintTime(__icTimeNs/__icReps);\n");
        }
        Fragments { first, last }
    }
}

fn build_prologue(target: Target) -> String {
    let windows = target == Target::Windows;
    let mut p = String::with_capacity(8 * 1024);
    let _ = writeln!(p, "#line 1 \"{PROLOGUE_NAME}\"");

    for bits in [8, 16, 32, 64] {
        bin_function(&mut p, bits);
    }
    p.push_str(
        "char *__binfloat32(float x) {union {uint32_t u; float f;} v; v.f = x; return __bin32(v.u);}\n\
char *__binfloat64(double x) {union {uint64_t u; double f;} v; v.f = x; return __bin64(v.u);}\n",
    );
    p.push_str("#define BIN(X) _Generic((X),");
    for bits in [8, 16, 32, 64] {
        let _ = write!(p, "int{bits}_t:__bin{bits},uint{bits}_t:__bin{bits},");
    }
    p.push_str("float:__binfloat32,double:__binfloat64,default:__bin64)(X)\n");
    p.push_str(MACROS);

    p.push_str(
        "#define PRINT(X) do {if (__LINE__>LASTLINE) _Generic((X),\
int8_t:__printi8,int16_t:__printi16,int32_t:__printi32,int64_t:__printi64,\
uint8_t:__printu8,uint16_t:__printu16,uint32_t:__printu32,uint64_t:__printu64,",
    );
    p.push_str(if windows {
        "long:__printil,unsigned long:__printul,"
    } else {
        "long long:__printill,unsigned long long:__printull,"
    });
    p.push_str(
        "float:__printf32,double:__printf64,long double:__printld,\
bool:__printb,char:__printc,char*:__prints,char const*:__printcs,\
default:__printp)(X);} while (0)\n",
    );
    p.push_str(
        "#define WPRINT(X) do {if (__LINE__>LASTLINE) _Generic((X),\
wchar_t*:__printws,wchar_t const*:__printwcs,wchar_t:__printwc,default:__printp)(X);} while(0)\n",
    );

    p.push_str(FIXED_PRINTERS);
    p.push_str(r##"void __printi32(int32_t x) {printf("(int32_t) %"PRId32" = 0x%08"PRIX32,x,x);switch(x) {"##);
    char_cases(&mut p, " = ");
    p.push_str("default: if (x<=126 && x>=32) printf(\" = '%c'\",x);}puts(\"\");}\n");
    p.push_str(WIDE_PRINTERS);
    p.push_str(if windows {
        LONG_PRINTERS_WINDOWS
    } else {
        LONG_PRINTERS_UNIX
    });
    p.push_str(FLOAT_PRINTERS);

    p.push_str("void __printc(char x) {switch (x) {");
    char_cases(&mut p, "");
    p.push_str(
        "default:if (x<=126 && x>=32) printf(\"'%c'\",x);\
else printf(\"'\\\\x%02X'\",(int)(unsigned char)x);}puts(\"\");}\n",
    );
    p.push_str(STRING_PRINTERS);
    let _ = writeln!(
        p,
        "void __printp(void *x) {{printf(\"{}\\n\",x);}}",
        if windows { "0x%p" } else { "%p" }
    );
    p.push_str(PRINTMEM);

    for func in ["printf", "puts", "putchar"] {
        patch(&mut p, func);
    }
    if windows {
        p.push_str("__declspec(dllexport)");
    }
    p.push_str("int ic_main(int argc, char **argv) {\n(void) argc; (void) argv;\n");
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fragments_carry_line_markers() {
        assert_eq!(
            Fragments::statement(0, "int x = 1;\n").last,
            "#line 1 \"<string>\"\nint x = 1;\n"
        );
        assert_eq!(
            Fragments::expression(2, "x + 1\n").last,
            "#line 3 \"<string>\"\nPRINT((x + 1));\n"
        );
        assert_eq!(
            Fragments::top_level(4, "#include <assert.h>\n").first,
            "#line 5 \"<string>\"\n#include <assert.h>\n"
        );
    }

    #[test]
    fn expression_with_trailing_comment_closes_on_next_line() {
        assert_eq!(
            Fragments::expression(0, "x // why\n").last,
            "#line 1 \"<string>\"\nPRINT((x // why\n));\n"
        );
    }

    #[test]
    fn introspection_fragments() {
        assert_eq!(
            Fragments::object_dump(1, "arr").last,
            "#line 2 \"<string>\"\n__printmem(&(arr),sizeof(arr));\n"
        );
        assert_eq!(
            Fragments::memory_dump(1, "p, 4").last,
            "#line 2 \"<string>\"\n__printmem(p, 4);\n"
        );
        assert_eq!(
            Fragments::macro_expansion(0, "MAX(a,b)").last,
            "#line 1 \"<string>\"\nprintf(\"%s\\n\", __IC_STRINGIFY(MAX(a,b)));\n"
        );
    }

    #[test]
    fn prologue_shape() {
        let s = Synthesizer::new(Target::Unix);
        let p = s.prologue();
        assert!(p.starts_with("#line 1 \"nowhere\"\n"));
        assert!(p.ends_with("int ic_main(int argc, char **argv) {\n(void) argc; (void) argv;\n"));
        assert!(p.contains("long long:__printill"));
        assert!(p.contains("void __printf32(float x)"));
        assert!(p.contains("case '\\f': printf(\"'\\\\f'\"); break;"));
        assert!(p.contains(
            "#define puts(...) do {if (__LINE__>LASTLINE) puts(__VA_ARGS__);} while(0)\n"
        ));
        assert!(!p.contains("__declspec"));

        let w = Synthesizer::new(Target::Windows);
        assert!(w.prologue().contains("long:__printil,unsigned long:__printul,"));
        assert!(w.prologue().contains("__declspec(dllexport)int ic_main("));
        assert!(w.prologue().contains("printf(\"0x%p\\n\",x)"));
    }

    #[test]
    fn bin_function_text() {
        let mut s = String::new();
        bin_function(&mut s, 8);
        assert_eq!(
            s,
            "char *__bin8(int8_t x) {static char b[8+8/4] = {0};int o = 0;\
for (int i = 0; i<8; ++i) {if (i>0 && i%4==0) b[o++] = '_';b[o++] = x<0?'1':'0'; x <<= 1;}\
b[o] = 0; return b;}\n"
        );
    }

    #[test]
    fn unit_order() {
        let s = Synthesizer::new(Target::Unix);
        let unit = s.synthesize(3, "PRE\n", "FIRST\n", "BODY\n", "LAST\n");
        let idx = |needle: &str| unit.find(needle).unwrap();
        assert!(idx("#include <wchar.h>") < idx("PRE\n"));
        assert!(idx("PRE\n") < idx("FIRST\n"));
        assert!(idx("FIRST\n") < idx("#line 1 \"nowhere\""));
        assert!(idx("#define LASTLINE 3\n") < idx("BODY\n"));
        assert!(idx("BODY\n") < idx("LAST\n"));
        assert!(unit.ends_with("LAST\nreturn 0;\n}\n"));
    }

    #[test]
    fn timing_once_and_repeated() {
        let s = Synthesizer::new(Target::Unix);
        let once = s.timing(0, None, "f();\n");
        assert!(once.first.starts_with("#include <time.h>\nstatic void __icPrintTime"));
        assert!(once.last.starts_with("#line 1 \"<string>\"\nstruct timespec"));
        assert!(!once.last.contains("__icReps"));
        assert!(once.last.contains("f();\nclock_gettime(CLOCK_MONOTONIC, &__icEnd);"));

        let rep = s.timing(0, Some("1000"), "f();\n");
        assert!(rep.last.contains(
            "uint64_t __icReps = (1000);\nfor (uint64_t __icI = 0; __icI<__icReps; ++__icI) {\nf();\n}\n"
        ));
        assert!(rep.last.ends_with("printf(\"Average time: \");__icPrintTime(__icTimeNs/__icReps);\n"));

        let win = Synthesizer::new(Target::Windows).timing(0, None, "f();\n");
        assert!(win.first.starts_with("#include <windows.h>\n"));
        assert!(win.last.contains("QueryPerformanceCounter(&__icStart);"));
    }
}

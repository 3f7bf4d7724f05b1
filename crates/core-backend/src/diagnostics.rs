//! Rewriting compiler output so locations refer to REPL lines.
//!
//! The synthesizer stamps user code with `#line N "<string>"` and the
//! prologue with `"nowhere"`, so gcc-like drivers report `<string>:N:C:` and
//! MSVC reports `<string>(N,C):`. Both become `line N:C:`; prologue
//! locations become `<prelude>:N:`.

const USER_FILE: &str = "<string>";
const PROLOGUE_FILE: &str = "nowhere";

fn leading_digits(s: &str) -> usize {
    s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len())
}

/// Split `:N:C: rest` or `(N,C): rest` into (`N:C`, `: rest`).
fn location(after: &str) -> Option<(String, &str)> {
    if let Some(rest) = after.strip_prefix(':') {
        let line_len = leading_digits(rest);
        if line_len == 0 {
            return None;
        }
        let mut end = line_len;
        if let Some(col) = rest[end..].strip_prefix(':') {
            let col_len = leading_digits(col);
            if col_len > 0 {
                end += 1 + col_len;
            }
        }
        return Some((rest[..end].to_string(), &rest[end..]));
    }
    let inner = after.strip_prefix('(')?;
    let close = inner.find(')')?;
    let loc = &inner[..close];
    if loc.is_empty() || !loc.chars().all(|c| c.is_ascii_digit() || c == ',') {
        return None;
    }
    Some((loc.replace(',', ":"), &inner[close + 1..]))
}

fn remap_line(line: &str) -> String {
    for (file, label) in [(USER_FILE, "line "), (PROLOGUE_FILE, "<prelude>:")] {
        let Some(idx) = line.find(file) else {
            continue;
        };
        let after = &line[idx + file.len()..];
        if let Some((loc, tail)) = location(after) {
            return format!("{label}{loc}{tail}");
        }
        if file == USER_FILE {
            return format!("{}input{after}", &line[..idx]);
        }
    }
    line.to_string()
}

/// Remap every line of `output`, keeping line terminators.
pub fn remap_diagnostics(output: &str) -> String {
    output
        .split_inclusive('\n')
        .map(|l| match l.strip_suffix('\n') {
            Some(body) => {
                let body = body.strip_suffix('\r').unwrap_or(body);
                format!("{}\n", remap_line(body))
            }
            None => remap_line(l),
        })
        .collect()
}

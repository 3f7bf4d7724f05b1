//! Argument splitting for shell lines and `;o` / `;a` commands.
//!
//! Words are separated by spaces. Single quotes group text verbatim, and a
//! doubled quote inside quotes stands for one literal quote. There is no
//! other escaping. The last word is always emitted, so blank input yields a
//! single empty word.

pub fn split_words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_quote = false;
    let mut was_space = false;
    let mut chars = input.trim().chars().peekable();
    while let Some(c) = chars.next() {
        if in_quote {
            was_space = false;
            if c != '\'' {
                word.push(c);
            } else if chars.peek() == Some(&'\'') {
                word.push('\'');
                chars.next();
            } else {
                in_quote = false;
            }
        } else if c == '\'' {
            in_quote = true;
            was_space = false;
        } else if c == ' ' {
            if !was_space {
                words.push(std::mem::take(&mut word));
            }
            was_space = true;
        } else {
            was_space = false;
            word.push(c);
        }
    }
    words.push(word);
    words
}

// builder/math.rs
// Math text handling in two stages: normalize every input form into a
// canonical LaTeX-like shape, then render that shape in the teacher's
// requested format.

use crate::domain::MathFormat;

// ============================================================================
// Normalization (canonical form first)
// ============================================================================

/// Rewrites Unicode superscripts, ASCII roots, bare fractions, and
/// loose multiplication into the canonical form the formatter
/// understands.
pub fn normalize_math(raw: &str) -> String {
    let s = superscripts_to_carets(raw);
    let s = unicode_sqrt_to_canonical(&s);
    let s = ascii_sqrt_to_canonical(&s);
    let s = brace_carets(&s);
    let s = paren_fractions_to_canonical(&s);
    let s = numeric_fractions_to_canonical(&s);
    let s = tighten_multiplication(&s);
    dedupe_double_braces(&s)
}

fn superscript_digit(c: char) -> Option<char> {
    match c {
        '\u{2070}' => Some('0'),
        '\u{00B9}' => Some('1'),
        '\u{00B2}' => Some('2'),
        '\u{00B3}' => Some('3'),
        '\u{2074}' => Some('4'),
        '\u{2075}' => Some('5'),
        '\u{2076}' => Some('6'),
        '\u{2077}' => Some('7'),
        '\u{2078}' => Some('8'),
        '\u{2079}' => Some('9'),
        _ => None,
    }
}

fn digit_to_superscript(c: char) -> Option<char> {
    match c {
        '0' => Some('\u{2070}'),
        '1' => Some('\u{00B9}'),
        '2' => Some('\u{00B2}'),
        '3' => Some('\u{00B3}'),
        '4' => Some('\u{2074}'),
        '5' => Some('\u{2075}'),
        '6' => Some('\u{2076}'),
        '7' => Some('\u{2077}'),
        '8' => Some('\u{2078}'),
        '9' => Some('\u{2079}'),
        _ => None,
    }
}

/// `x²` becomes `x^{2}`.
fn superscripts_to_carets(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut run = String::new();
    for c in s.chars() {
        if let Some(d) = superscript_digit(c) {
            run.push(d);
        } else {
            if !run.is_empty() {
                out.push_str(&format!("^{{{}}}", run));
                run.clear();
            }
            out.push(c);
        }
    }
    if !run.is_empty() {
        out.push_str(&format!("^{{{}}}", run));
    }
    out
}

/// Index of the parenthesis that closes the one at `open`.
fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// `√(x+1)` and `√x` become `\sqrt{...}`.
fn unicode_sqrt_to_canonical(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\u{221A}' {
            if i + 1 < chars.len() && chars[i + 1] == '(' {
                if let Some(close) = matching_paren(&chars, i + 1) {
                    let inner: String = chars[i + 2..close].iter().collect();
                    out.push_str(&format!("\\sqrt{{{}}}", inner));
                    i = close + 1;
                    continue;
                }
            }
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_alphanumeric() {
                j += 1;
            }
            if j > i + 1 {
                let inner: String = chars[i + 1..j].iter().collect();
                out.push_str(&format!("\\sqrt{{{}}}", inner));
                i = j;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// `sqrt(x+1)` becomes `\sqrt{x+1}`.
fn ascii_sqrt_to_canonical(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        let is_word_start = i == 0 || !chars[i - 1].is_alphanumeric();
        if is_word_start
            && i + 4 < chars.len()
            && chars[i..i + 4].iter().collect::<String>() == "sqrt"
            && chars[i + 4] == '('
        {
            if let Some(close) = matching_paren(&chars, i + 4) {
                let inner: String = chars[i + 5..close].iter().collect();
                out.push_str(&format!("\\sqrt{{{}}}", inner));
                i = close + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// `x^2` and `x^-2` become `x^{2}` / `x^{-2}`.
fn brace_carets(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '^' && i + 1 < chars.len() && chars[i + 1] != '{' {
            let mut j = i + 1;
            if chars[j] == '-' {
                j += 1;
            }
            let start = j;
            while j < chars.len() && chars[j].is_alphanumeric() {
                j += 1;
            }
            if j > start {
                let exponent: String = chars[i + 1..j].iter().collect();
                out.push_str(&format!("^{{{}}}", exponent));
                i = j;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// `(x+1)/(x-1)` becomes `\frac{x+1}{x-1}`.
fn paren_fractions_to_canonical(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '(' {
            if let Some(close) = matching_paren(&chars, i) {
                if close + 2 < chars.len() && chars[close + 1] == '/' && chars[close + 2] == '(' {
                    if let Some(close2) = matching_paren(&chars, close + 2) {
                        let numerator: String = chars[i + 1..close].iter().collect();
                        let denominator: String = chars[close + 3..close2].iter().collect();
                        out.push_str(&format!("\\frac{{{}}}{{{}}}", numerator, denominator));
                        i = close2 + 1;
                        continue;
                    }
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Bare `3/4` becomes `\frac{3}{4}`.
fn numeric_fractions_to_canonical(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let boundary_ok = i == 0 || !(chars[i - 1].is_alphanumeric() || chars[i - 1] == '}');
            let start = i;
            let mut j = i;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            if boundary_ok && j < chars.len() && chars[j] == '/' {
                let den_start = j + 1;
                let mut k = den_start;
                while k < chars.len() && chars[k].is_ascii_digit() {
                    k += 1;
                }
                let den_boundary_ok = k == chars.len() || !chars[k].is_alphanumeric();
                if k > den_start && den_boundary_ok {
                    let numerator: String = chars[start..j].iter().collect();
                    let denominator: String = chars[den_start..k].iter().collect();
                    out.push_str(&format!("\\frac{{{}}}{{{}}}", numerator, denominator));
                    i = k;
                    continue;
                }
            }
            for &c in &chars[start..j] {
                out.push(c);
            }
            i = j;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// `3 · x` tightens to `3x`.
fn tighten_multiplication(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\u{00B7}' {
            let trailing: String = out.trim_end().to_string();
            let prev_is_digit = trailing.chars().last().map(|c| c.is_ascii_digit());
            let mut j = i + 1;
            while j < chars.len() && chars[j] == ' ' {
                j += 1;
            }
            let next_is_var = j < chars.len() && chars[j].is_alphabetic();
            if prev_is_digit == Some(true) && next_is_var {
                out = trailing;
                i = j;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn dedupe_double_braces(s: &str) -> String {
    s.replace("{{", "{").replace("}}", "}")
}

// ============================================================================
// Formatting
// ============================================================================

/// Renders canonical math in the requested display format.
pub fn format_math(canonical: &str, format: MathFormat) -> String {
    match format {
        MathFormat::Latex => canonical.to_string(),
        MathFormat::Unicode => {
            let s = frac_to_slash(canonical);
            let s = sqrt_render(&s, true);
            let s = caret_render(&s, true);
            dot_for_paren_multiplication(&s)
        }
        MathFormat::Plain => {
            let s = frac_to_slash(canonical);
            let s = sqrt_render(&s, false);
            caret_render(&s, false)
        }
    }
}

/// Index just past a `{...}` group starting at `open`.
fn braced_group(chars: &[char], open: usize) -> Option<(String, usize)> {
    if chars.get(open) != Some(&'{') {
        return None;
    }
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        if c == '{' {
            depth += 1;
        } else if c == '}' {
            depth -= 1;
            if depth == 0 {
                let inner: String = chars[open + 1..i].iter().collect();
                return Some((inner, i + 1));
            }
        }
    }
    None
}

/// `\frac{a}{b}` becomes `(a)/(b)`.
fn frac_to_slash(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && chars[i..].iter().collect::<String>().starts_with("\\frac{") {
            if let Some((numerator, after_num)) = braced_group(&chars, i + 5) {
                if let Some((denominator, after_den)) = braced_group(&chars, after_num) {
                    out.push_str(&format!("({})/({})", numerator, denominator));
                    i = after_den;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// `\sqrt{x}` becomes `√(x)` or `sqrt(x)`.
fn sqrt_render(s: &str, unicode: bool) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && chars[i..].iter().collect::<String>().starts_with("\\sqrt{") {
            if let Some((inner, after)) = braced_group(&chars, i + 5) {
                if unicode {
                    out.push_str(&format!("\u{221A}({})", inner));
                } else {
                    out.push_str(&format!("sqrt({})", inner));
                }
                i = after;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// `x^{2}` becomes `x²` (unicode, numeric exponents) or `x^2` (plain).
fn caret_render(s: &str, unicode: bool) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '^' {
            if let Some((exponent, after)) = braced_group(&chars, i + 1) {
                let all_digits = !exponent.is_empty()
                    && exponent.chars().all(|c| c.is_ascii_digit());
                if unicode && all_digits {
                    for d in exponent.chars() {
                        out.push(digit_to_superscript(d).unwrap_or(d));
                    }
                } else {
                    out.push('^');
                    out.push_str(&exponent);
                }
                i = after;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// `(a)(b)` reads as multiplication; make the dot explicit.
fn dot_for_paren_multiplication(s: &str) -> String {
    s.replace(")(", ")\u{00B7}(")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("x²", "x^{2}")]
    #[case("x^2", "x^{2}")]
    #[case("x^-2", "x^{-2}")]
    #[case("x^10 + y", "x^{10} + y")]
    #[case("3/4", "\\frac{3}{4}")]
    #[case("(x+1)/(x-1)", "\\frac{x+1}{x-1}")]
    #[case("sqrt(16)", "\\sqrt{16}")]
    #[case("√x", "\\sqrt{x}")]
    #[case("√(x+1)", "\\sqrt{x+1}")]
    #[case("3 · x", "3x")]
    #[case("x^{{2}}", "x^{2}")]
    fn normalizes_to_canonical(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_math(input), expected);
    }

    #[test]
    fn leaves_prose_fractions_of_words_alone() {
        assert_eq!(normalize_math("the cell wall"), "the cell wall");
        // A version label is not arithmetic.
        assert_eq!(normalize_math("v2/x"), "v2/x");
    }

    #[rstest]
    #[case("\\frac{3}{4}", "(3)/(4)")]
    #[case("x^{2}", "x\u{00B2}")]
    #[case("x^{12}", "x\u{00B9}\u{00B2}")]
    #[case("\\sqrt{x+1}", "\u{221A}(x+1)")]
    #[case("x^{n}", "x^n")]
    fn renders_unicode(#[case] canonical: &str, #[case] expected: &str) {
        assert_eq!(format_math(canonical, MathFormat::Unicode), expected);
    }

    #[rstest]
    #[case("\\sqrt{x}", "sqrt(x)")]
    #[case("x^{2}", "x^2")]
    #[case("\\frac{a}{b}", "(a)/(b)")]
    fn renders_plain(#[case] canonical: &str, #[case] expected: &str) {
        assert_eq!(format_math(canonical, MathFormat::Plain), expected);
    }

    #[test]
    fn latex_rendering_is_identity_on_canonical() {
        let canonical = normalize_math("solve x² = 9/4 using √(x)");
        assert_eq!(format_math(&canonical, MathFormat::Latex), canonical);
        assert!(canonical.contains("\\frac{9}{4}"));
        assert!(canonical.contains("x^{2}"));
        assert!(canonical.contains("\\sqrt{x}"));
    }

    #[test]
    fn unicode_round_trip_through_canonical() {
        let canonical = normalize_math("x² + 3/4");
        assert_eq!(
            format_math(&canonical, MathFormat::Unicode),
            "x\u{00B2} + (3)/(4)"
        );
    }

    #[test]
    fn paren_multiplication_gets_a_dot() {
        let canonical = normalize_math("(x+1)(x-1)");
        assert_eq!(
            format_math(&canonical, MathFormat::Unicode),
            "(x+1)\u{00B7}(x-1)"
        );
    }
}

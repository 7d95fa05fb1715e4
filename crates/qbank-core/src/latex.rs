//! Unicode math to LaTeX conversion and best-effort repair passes.
//!
//! Question text typed from scanned papers mixes plain text with Unicode
//! math (`θ`, `x²`, `10⁻¹⁵`, `√2`). The dashboard renders `$...$` spans
//! with KaTeX, so [`unicode_to_latex`] rewrites those characters into
//! inline math. [`LatexRepair`] cleans up text produced by earlier,
//! sloppier conversions (split scripts, doubled backslashes, empty spans).
//!
//! Neither pass checks that the result is valid LaTeX.

use regex::{Captures, Regex};
use tracing::debug;

use crate::bank::Exam;
use crate::error::BankResult;

/// A run of plain text or the inside of one `$...$` span.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Span {
    Text(String),
    Math(String),
}

/// Split on `$` delimiters. Returns `None` for an odd number of `$`.
fn split_math(text: &str) -> Option<Vec<Span>> {
    let parts: Vec<&str> = text.split('$').collect();
    if parts.len() % 2 == 0 {
        return None;
    }
    Some(
        parts
            .into_iter()
            .enumerate()
            .map(|(i, part)| {
                if i % 2 == 0 {
                    Span::Text(part.to_string())
                } else {
                    Span::Math(part.to_string())
                }
            })
            .collect(),
    )
}

/// Join spans back into text, dropping empty math spans and merging math
/// spans separated only by whitespace.
fn join_spans(spans: Vec<Span>) -> String {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match span {
            Span::Math(m) if m.trim().is_empty() => {}
            Span::Text(t) if t.is_empty() => {}
            Span::Math(m) => {
                let m = m.trim().to_string();
                let mut joined = false;
                if let Some(Span::Math(prev)) = merged.last_mut() {
                    push_math_token(prev, &m);
                    joined = true;
                } else if merged.len() >= 2 {
                    let gap_is_blank =
                        matches!(merged.last(), Some(Span::Text(t)) if t.trim().is_empty());
                    if gap_is_blank {
                        if let Some(Span::Math(_)) = merged.get(merged.len() - 2) {
                            merged.pop();
                            if let Some(Span::Math(prev)) = merged.last_mut() {
                                push_math_token(prev, &m);
                                joined = true;
                            }
                        }
                    }
                }
                if !joined {
                    merged.push(Span::Math(m));
                }
            }
            Span::Text(t) => match merged.last_mut() {
                Some(Span::Text(prev)) => prev.push_str(&t),
                _ => merged.push(Span::Text(t)),
            },
        }
    }

    let mut out = String::new();
    for span in merged {
        match span {
            Span::Text(t) => out.push_str(&t),
            Span::Math(m) => {
                out.push('$');
                out.push_str(&m);
                out.push('$');
            }
        }
    }
    out
}

/// Append `token` to a math body, separated by a space.
fn push_math_token(body: &mut String, token: &str) {
    if !body.is_empty() && !token.is_empty() {
        body.push(' ');
    }
    body.push_str(token);
}

/// Append `token` to a math body, adding a space only where a control word
/// would otherwise run into a following letter (`\pi` + `r`).
fn push_math_tight(body: &mut String, token: &str) {
    let ends_in_command = {
        let trailing: String = body
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        !trailing.is_empty() && body[..body.len() - trailing.len()].ends_with('\\')
    };
    if ends_in_command && token.starts_with(|c: char| c.is_ascii_alphabetic()) {
        body.push(' ');
    }
    body.push_str(token);
}

/// Merge adjacent `$...$` spans and drop empty ones. Text with unbalanced
/// `$` is returned unchanged.
pub fn merge_math_spans(text: &str) -> String {
    match split_math(text) {
        Some(spans) => join_spans(spans),
        None => text.to_string(),
    }
}

fn symbol_command(c: char) -> Option<&'static str> {
    Some(match c {
        'α' => r"\alpha",
        'β' => r"\beta",
        'γ' => r"\gamma",
        'δ' => r"\delta",
        'ε' => r"\epsilon",
        'θ' => r"\theta",
        'η' => r"\eta",
        'λ' => r"\lambda",
        'μ' => r"\mu",
        'π' => r"\pi",
        'ρ' => r"\rho",
        'σ' => r"\sigma",
        'τ' => r"\tau",
        'φ' => r"\phi",
        'ω' => r"\omega",
        'Δ' | '∆' => r"\Delta",
        'Ω' => r"\Omega",
        'Φ' => r"\Phi",
        '∞' => r"\infty",
        '∫' => r"\int",
        '∑' => r"\sum",
        '∂' => r"\partial",
        '∇' => r"\nabla",
        '≤' => r"\leq",
        '≥' => r"\geq",
        '≠' => r"\neq",
        '≈' => r"\approx",
        '∝' => r"\propto",
        '→' => r"\rightarrow",
        '←' => r"\leftarrow",
        '⇒' => r"\Rightarrow",
        '⇌' => r"\rightleftharpoons",
        '×' => r"\times",
        '÷' => r"\div",
        '·' => r"\cdot",
        '±' => r"\pm",
        '∈' => r"\in",
        '∪' => r"\cup",
        '∩' => r"\cap",
        'î' => r"\hat{i}",
        'ĵ' => r"\hat{j}",
        'Å' => r"\text{\AA}",
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Sup,
    Sub,
}

fn script_char(c: char) -> Option<(Script, &'static str)> {
    use Script::{Sub, Sup};
    Some(match c {
        '⁰' => (Sup, "0"),
        '¹' => (Sup, "1"),
        '²' => (Sup, "2"),
        '³' => (Sup, "3"),
        '⁴' => (Sup, "4"),
        '⁵' => (Sup, "5"),
        '⁶' => (Sup, "6"),
        '⁷' => (Sup, "7"),
        '⁸' => (Sup, "8"),
        '⁹' => (Sup, "9"),
        'ⁿ' => (Sup, "n"),
        'ⁱ' => (Sup, "i"),
        'ᵗ' => (Sup, "t"),
        'ʰ' => (Sup, "h"),
        '⁺' => (Sup, "+"),
        '⁻' => (Sup, "-"),
        '⊕' => (Sup, r"\oplus"),
        '₀' => (Sub, "0"),
        '₁' => (Sub, "1"),
        '₂' => (Sub, "2"),
        '₃' => (Sub, "3"),
        '₄' => (Sub, "4"),
        '₅' => (Sub, "5"),
        '₆' => (Sub, "6"),
        '₇' => (Sub, "7"),
        '₈' => (Sub, "8"),
        '₉' => (Sub, "9"),
        'ₐ' => (Sub, "a"),
        'ₑ' => (Sub, "e"),
        'ₒ' => (Sub, "o"),
        'ₓ' => (Sub, "x"),
        'ₙ' => (Sub, "n"),
        'ᵣ' => (Sub, "r"),
        'ₘ' => (Sub, "m"),
        'ₖ' => (Sub, "k"),
        'ₚ' => (Sub, "p"),
        'ₛ' => (Sub, "s"),
        'ₜ' => (Sub, "t"),
        '₊' => (Sub, "+"),
        '₋' => (Sub, "-"),
        _ => return None,
    })
}

const COMBINING_CIRCUMFLEX: char = '\u{0302}';

/// Attach a `^{..}` / `_{..}` script to whatever precedes it: the previous
/// math span, or the trailing alphanumeric token of the previous text.
fn attach_script(spans: &mut Vec<Span>, script: String) {
    match spans.last_mut() {
        Some(Span::Math(m)) => {
            m.push_str(&script);
            return;
        }
        Some(Span::Text(t)) => {
            let base_len = script_base_len(t);
            if base_len > 0 {
                let base = t.split_off(t.len() - base_len);
                if t.is_empty() {
                    spans.pop();
                }
                push_math(spans, format!("{base}{script}"));
                return;
            }
        }
        None => {}
    }
    push_math(spans, script);
}

/// Byte length of the token at the end of `text` that a script attaches to:
/// the trailing ASCII alphanumeric run, decimal points between digits
/// included (`2.5²`).
fn script_base_len(text: &str) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut start = chars.len();
    while start > 0 {
        let c = chars[start - 1];
        let decimal_point = c == '.'
            && start >= 2
            && start < chars.len()
            && chars[start - 2].is_ascii_digit()
            && chars[start].is_ascii_digit();
        if !(c.is_ascii_alphanumeric() || decimal_point) {
            break;
        }
        start -= 1;
    }
    chars[start..].iter().map(|c| c.len_utf8()).sum()
}

fn push_math(spans: &mut Vec<Span>, token: String) {
    match spans.last_mut() {
        Some(Span::Math(m)) => push_math_token(m, &token),
        _ => spans.push(Span::Math(token)),
    }
}

fn push_text(spans: &mut Vec<Span>, c: char) {
    match spans.last_mut() {
        Some(Span::Text(t)) => t.push(c),
        _ => spans.push(Span::Text(c.to_string())),
    }
}

/// Argument of `√`: a parenthesized group or a run of alphanumerics.
/// Returns the argument and how many chars were consumed.
fn sqrt_argument(chars: &[char]) -> (String, usize) {
    if chars.first() == Some(&'(') {
        let mut depth = 0usize;
        for (i, &c) in chars.iter().enumerate() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return (chars[1..i].iter().collect(), i + 1);
                    }
                }
                _ => {}
            }
        }
        return (String::new(), 0);
    }
    let len = chars
        .iter()
        .take_while(|c| c.is_ascii_alphanumeric() || **c == '.')
        .count();
    (chars[..len].iter().collect(), len)
}

fn convert_spans(text: &str) -> Vec<Span> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans: Vec<Span> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some((kind, _)) = script_char(c) {
            let mut body = String::new();
            let mut count = 0;
            while let Some((k, s)) = chars.get(i).and_then(|&c| script_char(c)) {
                if k != kind {
                    break;
                }
                body.push_str(s);
                count += 1;
                i += 1;
            }
            let marker = if kind == Script::Sup { '^' } else { '_' };
            let script = if count == 1 && !body.starts_with('\\') {
                format!("{marker}{body}")
            } else {
                format!("{marker}{{{body}}}")
            };
            attach_script(&mut spans, script);
            continue;
        }

        if c == COMBINING_CIRCUMFLEX {
            let base = match spans.last_mut() {
                Some(Span::Text(t)) => t.pop(),
                _ => None,
            };
            if let Some(Span::Text(t)) = spans.last() {
                if t.is_empty() {
                    spans.pop();
                }
            }
            match base {
                Some(b) => push_math(&mut spans, format!(r"\hat{{{b}}}")),
                None => push_text(&mut spans, c),
            }
            i += 1;
            continue;
        }

        if c == '√' {
            let (arg, consumed) = sqrt_argument(&chars[i + 1..]);
            i += 1 + consumed;
            if arg.is_empty() {
                push_math(&mut spans, r"\sqrt".to_string());
            } else {
                push_math(&mut spans, format!(r"\sqrt{{{}}}", math_body(&arg)));
            }
            continue;
        }

        match symbol_command(c) {
            Some(cmd) => push_math(&mut spans, cmd.to_string()),
            None => push_text(&mut spans, c),
        }
        i += 1;
    }
    spans
}

/// Convert text that is already inside math mode (no `$` wrapping).
fn math_body(text: &str) -> String {
    let mut body = String::new();
    for span in convert_spans(text) {
        match span {
            Span::Text(t) | Span::Math(t) => push_math_tight(&mut body, &t),
        }
    }
    body
}

/// Replace Unicode math characters with inline LaTeX.
///
/// Sub- and superscript runs are grouped (`10⁻¹⁵` becomes `$10^{-15}$`) and
/// attached to the token before them, `√2` and `√(x+1)` become `\sqrt{..}`,
/// and neighbouring math spans are merged. Text with an unbalanced `$` is
/// returned unchanged, since new spans would pair with the stray delimiter.
pub fn unicode_to_latex(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    // existing $...$ spans are kept verbatim, only text runs are converted
    let Some(existing) = split_math(text) else {
        debug!(text, "unbalanced $, left as is");
        return text.to_string();
    };
    let mut spans = Vec::new();
    for span in existing {
        match span {
            Span::Text(t) => spans.extend(convert_spans(&t)),
            math => spans.push(math),
        }
    }
    join_spans(spans)
}

/// Regex rules for repairing previously converted text.
pub struct LatexRepair {
    doubled_backslash: Regex,
    split_inverse_trig: Regex,
    detached_script: Regex,
    sqrt_token: Regex,
    sqrt_group: Regex,
    integral_limits: Regex,
    exponential: Regex,
    bare_function: Regex,
}

impl LatexRepair {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            doubled_backslash: Regex::new(r"\\{2,}([A-Za-z])")?,
            split_inverse_trig: Regex::new(
                r"\\?(sin|cos|tan|cot|sec|csc)\s*(?:\$\^-\$\s*\$\^1\$|\$\^-\s*\^1\$|\$\^\{-1\}\$)",
            )?,
            detached_script: Regex::new(
                r"(^|[^\\A-Za-z0-9])([A-Za-z0-9]+)\$([\^_])(\{[^}$]*\}|[A-Za-z0-9+\-]+)\$",
            )?,
            sqrt_token: Regex::new(r"\$\\sqrt\$([A-Za-z0-9.]+)")?,
            sqrt_group: Regex::new(r"\$\\sqrt\$\(([^)$]+)\)")?,
            integral_limits: Regex::new(
                r"\$\\int\$\s*\$?_\{?([A-Za-z0-9]+)\}?\$?\s*\$?\^\{?([A-Za-z0-9]+)\}?\$?",
            )?,
            exponential: Regex::new(r"(^|[^\\A-Za-z])e\$\^(\{[^}$]*\}|[^$\s]+)\$")?,
            bare_function: Regex::new(
                r"(^|[^\\A-Za-z])(sin|cos|tan|cot|sec|csc|ln|log|infty)\b",
            )?,
        })
    }

    /// Apply every repair rule, then merge math spans.
    pub fn repair(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let mut s = self
            .doubled_backslash
            .replace_all(text, r"\$1")
            .into_owned();

        s = self
            .split_inverse_trig
            .replace_all(&s, |c: &Captures| format!("$\\{}^{{-1}}$", &c[1]))
            .into_owned();

        s = self
            .sqrt_group
            .replace_all(&s, |c: &Captures| format!("$\\sqrt{{{}}}$", &c[1]))
            .into_owned();
        s = self
            .sqrt_token
            .replace_all(&s, |c: &Captures| format!("$\\sqrt{{{}}}$", &c[1]))
            .into_owned();

        s = self
            .integral_limits
            .replace_all(&s, |c: &Captures| {
                format!("$\\int_{{{}}}^{{{}}}$", &c[1], &c[2])
            })
            .into_owned();

        s = self
            .exponential
            .replace_all(&s, |c: &Captures| {
                let exp = c[2].trim_start_matches('{').trim_end_matches('}');
                format!("{}$e^{{{}}}$", &c[1], exp)
            })
            .into_owned();

        // Each replacement consumes the char before the base, so a second
        // sweep picks up neighbours like `x$^2$y$^2$`.
        for _ in 0..2 {
            s = self
                .detached_script
                .replace_all(&s, |c: &Captures| {
                    format!("{}${}{}{}$", &c[1], &c[2], &c[3], &c[4])
                })
                .into_owned();
        }

        match split_math(&s) {
            Some(spans) => {
                let spans = spans
                    .into_iter()
                    .map(|span| match span {
                        Span::Math(m) => Span::Math(
                            self.bare_function
                                .replace_all(&m, |c: &Captures| format!("{}\\{}", &c[1], &c[2]))
                                .into_owned(),
                        ),
                        text => text,
                    })
                    .collect();
                join_spans(spans)
            }
            None => s,
        }
    }
}

/// Which passes [`apply_to_exam`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatexPass {
    /// Unicode -> LaTeX only.
    Convert,
    /// Repair rules only.
    Repair,
    /// Convert, then repair.
    All,
}

/// Counts from a pass over a bank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatexReport {
    pub strings_seen: usize,
    pub strings_changed: usize,
}

/// Run `pass` over every question text and option in `exam`.
pub fn apply_to_exam(exam: &mut Exam, pass: LatexPass) -> BankResult<LatexReport> {
    let repair = LatexRepair::new()?;
    let run = |text: &str| -> String {
        match pass {
            LatexPass::Convert => unicode_to_latex(text),
            LatexPass::Repair => repair.repair(text),
            LatexPass::All => repair.repair(&unicode_to_latex(text)),
        }
    };

    let mut report = LatexReport::default();
    for question in exam.questions_mut() {
        let fields = std::iter::once(&mut question.text).chain(question.options.iter_mut());
        for field in fields {
            report.strings_seen += 1;
            let converted = run(field);
            if converted != *field {
                debug!(id = %question.id, before = %field, after = %converted, "rewrote math");
                *field = converted;
                report.strings_changed += 1;
            }
        }
    }
    Ok(report)
}

//! Syntax highlighting for the document projection.
//!
//! Two highlighters produce the same [`Projection`] shape: syntect with
//! Sublime Text's JSON grammar, and a deterministic regex tokenizer used when
//! syntect has no JSON syntax or the host opts out of it.

use std::ops::Range;
use std::sync::{Mutex, OnceLock};

use regex::Regex;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Key,
    String,
    Number,
    Literal,
    Punctuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub span: Range<usize>,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// A run of text on one projected line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedSpan {
    pub text: String,
    /// Classification from the fallback tokenizer.
    pub kind: Option<TokenKind>,
    /// Explicit color from an external highlighter.
    pub fg: Option<Rgb>,
}

impl ProjectedSpan {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            kind: None,
            fg: None,
        }
    }
}

/// The highlighted rendition of a document, one entry per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    lines: Vec<Vec<ProjectedSpan>>,
}

impl Projection {
    pub const fn empty() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn lines(&self) -> &[Vec<ProjectedSpan>] {
        &self.lines
    }

    pub fn line(&self, idx: usize) -> Option<&[ProjectedSpan]> {
        self.lines.get(idx).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Turns document text into a [`Projection`].
pub trait Highlighter {
    fn name(&self) -> &'static str;

    fn project(&self, text: &str) -> Projection;
}

/// Pick syntect when it knows JSON, otherwise the fallback tokenizer.
pub fn default_highlighter(prefer_external: bool) -> Box<dyn Highlighter> {
    if prefer_external && let Some(syntect) = SyntectHighlighter::new() {
        return Box::new(syntect);
    }
    Box::new(FallbackHighlighter)
}

// --- Fallback tokenizer ---

/// Regex highlighter. Rules run in a fixed order (strings and keys, numbers,
/// literals, punctuation) and a later rule never claims bytes an earlier rule
/// already claimed, so the output depends only on the input text.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackHighlighter;

impl Highlighter for FallbackHighlighter {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn project(&self, text: &str) -> Projection {
        if text.trim().is_empty() {
            return Projection::empty();
        }
        let tokens = tokenize(text);
        let mut lines = Vec::new();
        let mut next_token = 0;
        let mut line_start = 0;
        for line in text.split('\n') {
            let line_end = line_start + line.len();
            let mut spans = Vec::new();
            let mut pos = line_start;
            while let Some(token) = tokens.get(next_token) {
                if token.span.start >= line_end {
                    break;
                }
                if token.span.start > pos {
                    spans.push(ProjectedSpan::plain(&text[pos..token.span.start]));
                }
                spans.push(ProjectedSpan {
                    text: text[token.span.clone()].to_string(),
                    kind: Some(token.kind),
                    fg: None,
                });
                pos = token.span.end;
                next_token += 1;
            }
            if pos < line_end {
                spans.push(ProjectedSpan::plain(&text[pos..line_end]));
            }
            lines.push(spans);
            line_start = line_end + 1;
        }
        Projection { lines }
    }
}

fn rules() -> &'static [(Option<TokenKind>, Regex); 4] {
    static RULES: OnceLock<[(Option<TokenKind>, Regex); 4]> = OnceLock::new();
    RULES.get_or_init(|| {
        let compile = |pattern: &str| Regex::new(pattern).expect("static highlight pattern");
        [
            // Strings become keys or values depending on a following ':'.
            (None, compile(r#""(?:[^"\\\n]|\\.)*""#)),
            (
                Some(TokenKind::Number),
                compile(r"-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?"),
            ),
            (
                Some(TokenKind::Literal),
                compile(r"\b(?:true|false|null)\b"),
            ),
            (Some(TokenKind::Punctuation), compile(r"[{}\[\],:]")),
        ]
    })
}

/// Classify the document into highlight tokens, sorted by position.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut claimed = vec![false; text.len()];
    let mut tokens = Vec::new();
    for (kind, regex) in rules() {
        for m in regex.find_iter(text) {
            let span = m.range();
            if claimed[span.clone()].iter().any(|&c| c) {
                continue;
            }
            let kind = kind.unwrap_or_else(|| string_kind(text, span.end));
            claimed[span.clone()].fill(true);
            tokens.push(Token { span, kind });
        }
    }
    tokens.sort_by_key(|t| t.span.start);
    tokens
}

fn string_kind(text: &str, end: usize) -> TokenKind {
    if text[end..].trim_start().starts_with(':') {
        TokenKind::Key
    } else {
        TokenKind::String
    }
}

// --- Syntect ---

/// External highlighter backed by syntect's JSON grammar.
pub struct SyntectHighlighter {
    syntax: &'static SyntaxReference,
}

impl SyntectHighlighter {
    /// `None` when the bundled syntax set has no JSON definition.
    pub fn new() -> Option<Self> {
        let syntax = syntax_set()
            .find_syntax_by_extension("json")
            .or_else(|| syntax_set().find_syntax_by_name("JSON"))?;
        Some(Self { syntax })
    }
}

impl Highlighter for SyntectHighlighter {
    fn name(&self) -> &'static str {
        "syntect"
    }

    fn project(&self, text: &str) -> Projection {
        if text.trim().is_empty() {
            return Projection::empty();
        }
        let _scope = crate::perf::scope("highlight.syntect.project");
        let mode = background_mode();
        let mut highlighter = HighlightLines::new(self.syntax, theme());
        let mut lines = Vec::new();
        for line in text.split('\n') {
            let ranges = highlighter
                .highlight_line(line, syntax_set())
                .unwrap_or_default();
            let spans = ranges
                .into_iter()
                .map(|(style, piece)| ProjectedSpan {
                    text: piece.to_string(),
                    kind: None,
                    fg: Some(adjust_fg_for_background(
                        Rgb {
                            r: style.foreground.r,
                            g: style.foreground.g,
                            b: style.foreground.b,
                        },
                        mode,
                    )),
                })
                .collect();
            lines.push(spans);
        }
        Projection { lines }
    }
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(|| {
        let _scope = crate::perf::scope("highlight.syntax_set.load_defaults");
        SyntaxSet::load_defaults_newlines()
    })
}

fn theme() -> &'static Theme {
    static THEME: OnceLock<Theme> = OnceLock::new();
    THEME.get_or_init(|| {
        let _scope = crate::perf::scope("highlight.theme.load_defaults");
        let theme_set = ThemeSet::load_defaults();
        let preferred = match background_mode() {
            BackgroundMode::Dark => [
                "Monokai Extended",
                "Monokai Extended Bright",
                "Solarized (dark)",
                "base16-ocean.dark",
            ]
            .as_slice(),
            BackgroundMode::Light => [
                "InspiredGitHub",
                "Solarized (light)",
                "base16-ocean.light",
            ]
            .as_slice(),
        };

        for name in preferred {
            if let Some(theme) = theme_set.themes.get(*name) {
                return theme.clone();
            }
        }

        theme_set
            .themes
            .values()
            .next()
            .cloned()
            .unwrap_or_default()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackgroundMode {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightBackground {
    Light,
    Dark,
}

static BACKGROUND_OVERRIDE: OnceLock<Mutex<Option<HighlightBackground>>> = OnceLock::new();

pub fn set_background_mode(mode: Option<HighlightBackground>) {
    let lock = BACKGROUND_OVERRIDE.get_or_init(|| Mutex::new(None));
    if let Ok(mut guard) = lock.lock() {
        *guard = mode;
    }
}

pub fn is_light_background() -> bool {
    background_mode() == BackgroundMode::Light
}

fn background_mode() -> BackgroundMode {
    let lock = BACKGROUND_OVERRIDE.get_or_init(|| Mutex::new(None));
    if let Ok(guard) = lock.lock()
        && let Some(mode) = *guard
    {
        return match mode {
            HighlightBackground::Light => BackgroundMode::Light,
            HighlightBackground::Dark => BackgroundMode::Dark,
        };
    }
    background_mode_from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
}

fn background_mode_from_colorfgbg(colorfgbg: Option<&str>) -> BackgroundMode {
    let Some(value) = colorfgbg else {
        return BackgroundMode::Dark;
    };
    let bg_str = value.rsplit(';').next().unwrap_or(value);
    let Ok(bg) = bg_str.parse::<u8>() else {
        return BackgroundMode::Dark;
    };

    if bg >= 7 {
        BackgroundMode::Light
    } else {
        BackgroundMode::Dark
    }
}

fn adjust_fg_for_background(color: Rgb, mode: BackgroundMode) -> Rgb {
    match mode {
        BackgroundMode::Dark => color,
        BackgroundMode::Light => {
            let luma = (0.2126 * f32::from(color.r))
                + (0.7152 * f32::from(color.g))
                + (0.0722 * f32::from(color.b));
            if luma < 155.0 {
                return color;
            }
            let darken = |c: u8| (f32::from(c) * 0.42).round() as u8;
            Rgb {
                r: darken(color.r),
                g: darken(color.g),
                b: darken(color.b),
            }
        }
    }
}

//! Colors for the document projection and the editor chrome.
//!
//! Uses ANSI colors that adapt to the terminal's palette; explicit colors
//! from syntect are passed through as truecolor or the nearest xterm-256
//! entry.

use ratatui::style::{Color, Modifier, Style};

use crate::highlight::{ProjectedSpan, Rgb, TokenKind};

/// Style for a token from the fallback tokenizer.
pub fn style_for_token(kind: TokenKind) -> Style {
    let light_bg = crate::highlight::is_light_background();
    match kind {
        TokenKind::Key => Style::default()
            .fg(if light_bg {
                Color::Indexed(24)
            } else {
                Color::Cyan
            })
            .add_modifier(Modifier::BOLD),
        TokenKind::String => Style::default().fg(if light_bg {
            Color::Indexed(22)
        } else {
            Color::Green
        }),
        TokenKind::Number => Style::default().fg(if light_bg {
            Color::Indexed(130)
        } else {
            Color::Yellow
        }),
        TokenKind::Literal => Style::default()
            .fg(if light_bg {
                Color::Indexed(54)
            } else {
                Color::Magenta
            })
            .add_modifier(Modifier::ITALIC),
        TokenKind::Punctuation => Style::default().fg(if light_bg {
            Color::Indexed(240)
        } else {
            Color::Indexed(245)
        }),
    }
}

/// Style for one projected span: explicit color first, then token kind.
pub fn style_for_span(span: &ProjectedSpan) -> Style {
    if let Some(fg) = span.fg {
        return Style::default().fg(fg_color_for_terminal(fg));
    }
    span.kind.map_or_else(Style::default, style_for_token)
}

pub fn gutter_style(has_error: bool) -> Style {
    if has_error {
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn cursor_style(base: Style) -> Style {
    base.add_modifier(Modifier::REVERSED)
}

pub fn selection_style(base: Style) -> Style {
    let light_bg = crate::highlight::is_light_background();
    base.bg(if light_bg {
        Color::Indexed(153)
    } else {
        Color::Indexed(238)
    })
}

/// The flashed character at a jumped-to error.
pub fn error_mark_style(base: Style) -> Style {
    base.bg(Color::Red).fg(Color::White)
}

pub fn table_style() -> Style {
    let light_bg = crate::highlight::is_light_background();
    Style::default().fg(if light_bg {
        Color::Indexed(236)
    } else {
        Color::Indexed(252)
    })
}

pub fn table_header_style() -> Style {
    table_style().add_modifier(Modifier::BOLD)
}

fn fg_color_for_terminal(fg: Rgb) -> Color {
    if supports_truecolor() {
        Color::Rgb(fg.r, fg.g, fg.b)
    } else {
        Color::Indexed(rgb_to_xterm_256(fg.r, fg.g, fg.b))
    }
}

fn supports_truecolor() -> bool {
    if let Ok(force) = std::env::var("LDCONSOLE_TRUECOLOR") {
        let value = force.to_ascii_lowercase();
        return matches!(value.as_str(), "1" | "true" | "yes" | "on");
    }
    supports_truecolor_from_env(
        std::env::var("COLORTERM").ok().as_deref(),
        std::env::var("TERM").ok().as_deref(),
    )
}

fn supports_truecolor_from_env(colorterm: Option<&str>, term: Option<&str>) -> bool {
    let has = |value: Option<&str>, needles: &[&str]| {
        value.is_some_and(|v| {
            let lower = v.to_ascii_lowercase();
            needles.iter().any(|n| lower.contains(n))
        })
    };
    has(colorterm, &["truecolor", "24bit"]) || has(term, &["direct", "truecolor"])
}

fn rgb_to_xterm_256(r: u8, g: u8, b: u8) -> u8 {
    // Result is always 0-5, fits in u8
    #[allow(clippy::cast_possible_truncation)]
    let to_cube = |v: u8| ((u16::from(v) * 5) / 255) as u8;
    16 + (36 * to_cube(r)) + (6 * to_cube(g)) + to_cube(b)
}

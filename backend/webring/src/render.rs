//! # Presentation
//!
//! HTML fragments dropped into the `#webring-widget` container.
//!
//! - Compact: inline `◂ home ⤱ ▸` row
//! - Full: bordered box with member count, prev/random/next and the current title
//! - Not a member: invitation to join
//! - Error: `webring unavailable`
use std::fmt::Write;

use rand::Rng;

use crate::ring::Ring;

pub const RING_HOME: &str = "https://openmaking.club/webring";

const FONT: &str = "'JetBrains Mono', 'SF Mono', 'Courier New', monospace";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Anything but `dark` is light.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "dark" => Self::Dark,
            _ => Self::Light,
        }
    }

    fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                link: "#1976d2",
                link_hover: "#0d47a1",
                border: "#ccc",
                background: "#f8f9fa",
                text: "#333",
                title: "#f57c00",
                alert: "#d32f2f",
                divider: "#ddd",
            },
            Theme::Dark => Palette {
                link: "#4fc3f7",
                link_hover: "#81d4fa",
                border: "#333",
                background: "#1a1a2e",
                text: "#eee",
                title: "#ffc107",
                alert: "#ff6b6b",
                divider: "#333",
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Style {
    #[default]
    Compact,
    Full,
}

impl Style {
    /// Anything but `compact` is the full box.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "compact" => Self::Compact,
            _ => Self::Full,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    pub theme: Theme,
    pub style: Style,
}

struct Palette {
    link: &'static str,
    link_hover: &'static str,
    border: &'static str,
    background: &'static str,
    text: &'static str,
    title: &'static str,
    alert: &'static str,
    divider: &'static str,
}

pub fn render<R: Rng + ?Sized>(ring: &Ring, options: Options, rng: &mut R) -> String {
    let Some(current) = ring.current() else {
        return render_not_member(options);
    };

    let palette = options.theme.palette();

    let link = |site: Option<&crate::Site>, label: &str, title: &str| match site {
        Some(site) => format!(
            r#"<a href="{}" title="{}">{label}</a>"#,
            escape(&site.url),
            escape(title)
        ),
        None => String::new(),
    };

    let next = ring.next();
    let prev = ring.prev();
    let random = ring.random(rng);

    let prev_title = prev.map(|s| format!("Previous: {}", s.title)).unwrap_or_default();
    let next_title = next.map(|s| format!("Next: {}", s.title)).unwrap_or_default();

    let mut html = String::new();

    match options.style {
        Style::Compact => {
            let _ = write!(
                html,
                r#"<div class="webring-compact">{prev}<a href="{RING_HOME}" title="View all {count} sites" class="webring-home">OpenMaking WebRing</a>{random}{next}<style>.webring-compact {{ display: inline-flex; align-items: center; gap: 8px; font-size: 13px; font-family: {FONT}; line-height: 1; }} .webring-compact a {{ text-decoration: none; color: {link}; padding: 2px 4px; border-bottom: 1px dotted {link}; }} .webring-compact a:hover {{ color: {hover}; border-bottom: 1px solid {hover}; }} .webring-compact .webring-home {{ font-size: 11px; letter-spacing: 1px; text-transform: uppercase; }}</style></div>"#,
                prev = link(prev, "◂", &prev_title),
                random = link(random, "⤱", "Random site"),
                next = link(next, "▸", &next_title),
                count = ring.len(),
                link = palette.link,
                hover = palette.link_hover,
            );
        }
        Style::Full => {
            let _ = write!(
                html,
                r#"<div class="webring-full"><div class="webring-header"><a href="{RING_HOME}" title="View all sites" class="webring-title">OpenMaking WebRing</a><span class="webring-count">{count}</span></div><div class="webring-nav">{prev}{random}{next}</div><div class="webring-current">▸ {current}</div><style>.webring-full {{ border: 1px solid {border}; background: {background}; color: {text}; padding: 12px; font-family: {FONT}; font-size: 12px; text-align: center; max-width: 280px; margin: 16px 0; }} .webring-header {{ display: flex; justify-content: space-between; align-items: center; margin-bottom: 10px; }} .webring-title {{ text-decoration: none; color: {title}; font-weight: bold; letter-spacing: 1px; font-size: 13px; text-transform: uppercase; }} .webring-count {{ color: {link}; font-size: 11px; }} .webring-nav {{ display: flex; gap: 8px; justify-content: center; margin-bottom: 10px; flex-wrap: wrap; }} .webring-nav a {{ text-decoration: none; color: {link}; padding: 4px 8px; font-size: 11px; border-bottom: 1px dotted {link}; white-space: nowrap; }} .webring-nav a:hover {{ color: {hover}; border-bottom: 1px solid {hover}; }} .webring-current {{ font-size: 10px; opacity: 0.8; margin-top: 8px; padding-top: 8px; border-top: 1px solid {divider}; color: {alert}; }}</style></div>"#,
                count = ring.len(),
                prev = link(prev, "◂ prev", &prev_title),
                random = link(random, "⤱ random", "Random site"),
                next = link(next, "next ▸", &next_title),
                current = escape(&current.title),
                border = palette.border,
                background = palette.background,
                text = palette.text,
                title = palette.title,
                link = palette.link,
                hover = palette.link_hover,
                divider = palette.divider,
                alert = palette.alert,
            );
        }
    }

    html
}

pub fn render_not_member(options: Options) -> String {
    let palette = options.theme.palette();

    match options.style {
        Style::Compact => format!(
            r#"<div class="webring-not-member" style="font-family: {FONT}; font-size: 11px; color: {alert}; display: inline-flex; align-items: center; gap: 4px;"><a href="{RING_HOME}" style="color: {link}; text-decoration: none; border-bottom: 1px dotted {link};">join openmaking webring</a></div>"#,
            alert = palette.alert,
            link = palette.link,
        ),
        Style::Full => format!(
            r#"<div class="webring-not-member" style="border: 1px solid {border}; background: {background}; color: {text}; padding: 12px; font-family: {FONT}; font-size: 12px; text-align: center; max-width: 280px; margin: 16px 0;"><div style="color: {alert}; margin-bottom: 8px; font-size: 10px;">⚠ not a webring member</div><a href="{RING_HOME}" style="color: {link}; text-decoration: none; border-bottom: 1px dotted {link}; font-size: 11px;">join the openmaking webring</a></div>"#,
            border = palette.border,
            background = palette.background,
            text = palette.text,
            alert = palette.alert,
            link = palette.link,
        ),
    }
}

pub fn render_error() -> String {
    format!(
        r#"<div class="webring-error" style="font-family: {FONT}; font-size: 11px; color: #666; text-align: center; padding: 8px; border: 1px solid #ddd;">webring unavailable</div>"#
    )
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());

    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }

    escaped
}

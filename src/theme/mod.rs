//! Theme palettes for exported documents
//!
//! This module defines the colors used when generating the embedded CSS of
//! an exported document. The `Theme` selector in `config::settings` picks
//! which palette is used.
//!
//! # Theme Files
//!
//! - `light.rs` - Light palette
//! - `dark.rs` - Dark palette
//!
//! # Color Categories
//!
//! - **Base colors**: Page background, borders
//! - **Text colors**: Primary, secondary, link, code
//! - **Document colors**: Headings, blockquotes, code blocks, tables, diagrams

pub mod dark;
pub mod light;

use crate::config::Theme;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Color
// ─────────────────────────────────────────────────────────────────────────────

/// An opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceived luminance in the 0-255 range (ITU-R BT.601 weights).
    pub fn luminance(&self) -> u8 {
        let l = 0.299 * f32::from(self.r) + 0.587 * f32::from(self.g) + 0.114 * f32::from(self.b);
        l.round().clamp(0.0, 255.0) as u8
    }
}

/// Formats as a CSS `rgb()` value.
impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Theme Colors
// ─────────────────────────────────────────────────────────────────────────────

/// Complete palette for one exported document theme.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeColors {
    /// Base page colors (background, borders)
    pub base: BaseColors,
    /// Text colors for various contexts
    pub text: TextColors,
    /// Colors for rendered markdown elements
    pub document: DocumentColors,
    /// Name of the diagram runtime's built-in theme matching this palette
    pub diagram_theme: &'static str,
}

impl ThemeColors {
    /// Palette for the given theme selector.
    pub fn from_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self::light(),
            Theme::Dark => Self::dark(),
        }
    }

    /// Get the light theme colors.
    pub fn light() -> Self {
        light::palette()
    }

    /// Get the dark theme colors.
    pub fn dark() -> Self {
        dark::palette()
    }

    /// Check if this is a dark theme (useful for conditional styling).
    pub fn is_dark(&self) -> bool {
        self.base.background.luminance() < 128
    }

    /// CSS `color-scheme` keyword for this palette.
    pub fn color_scheme(&self) -> &'static str {
        if self.is_dark() {
            "dark"
        } else {
            "light"
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Palette Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Page background and border colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseColors {
    /// Page background color
    pub background: Rgb,
    /// Tertiary background (inline code)
    pub background_tertiary: Rgb,
    /// Primary border color
    pub border: Rgb,
}

/// Text colors for various contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextColors {
    /// Primary text color (main content)
    pub primary: Rgb,
    /// Secondary text color (captions, diagram errors)
    pub secondary: Rgb,
    /// Link text color
    pub link: Rgb,
    /// Code text color (inline code)
    pub code: Rgb,
}

/// Colors for rendered markdown elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentColors {
    /// Heading text color (H1-H6)
    pub heading: Rgb,
    /// Block quote border color
    pub blockquote_border: Rgb,
    /// Block quote text color
    pub blockquote_text: Rgb,
    /// Code block background color
    pub code_block_bg: Rgb,
    /// Code block border color
    pub code_block_border: Rgb,
    /// Horizontal rule color
    pub horizontal_rule: Rgb,
    /// Table border color
    pub table_border: Rgb,
    /// Table header background
    pub table_header_bg: Rgb,
    /// Background behind rendered diagrams
    pub diagram_bg: Rgb,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

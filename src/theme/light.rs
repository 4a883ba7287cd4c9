//! Light Theme Palette
//!
//! High contrast on a white page; matches what most readers expect from a
//! printed document.

use super::{BaseColors, DocumentColors, Rgb, TextColors, ThemeColors};

/// Build the light palette.
pub fn palette() -> ThemeColors {
    ThemeColors {
        base: BaseColors {
            background: Rgb::new(255, 255, 255),
            background_tertiary: Rgb::new(245, 245, 245),
            border: Rgb::new(200, 200, 200),
        },
        text: TextColors {
            primary: Rgb::new(30, 30, 30),
            secondary: Rgb::new(80, 80, 80),
            link: Rgb::new(0, 100, 180),
            code: Rgb::new(80, 80, 80),
        },
        document: DocumentColors {
            heading: Rgb::new(0, 100, 180),
            blockquote_border: Rgb::new(200, 200, 200),
            blockquote_text: Rgb::new(100, 100, 100),
            code_block_bg: Rgb::new(233, 236, 239),
            code_block_border: Rgb::new(195, 202, 210),
            horizontal_rule: Rgb::new(200, 200, 200),
            table_border: Rgb::new(200, 205, 210),
            table_header_bg: Rgb::new(240, 242, 245),
            diagram_bg: Rgb::new(255, 255, 255),
        },
        diagram_theme: "default",
    }
}

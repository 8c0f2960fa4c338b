//! Page geometry and typography for the fixed-page renderer.

use serde::{Deserialize, Serialize};

use crate::model::ImageLayout;

/// Points per inch.
pub const INCH: f32 = 72.0;

/// The base-14 faces the renderer embeds by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Font {
    /// Helvetica-Bold, titles and headings.
    HelveticaBold,
    /// Helvetica, footers.
    Helvetica,
    /// Helvetica-Oblique, captions.
    HelveticaOblique,
    /// Times-Roman, body text.
    TimesRoman,
    /// Times-Italic, quotes and songs.
    TimesItalic,
}

impl Font {
    /// The PDF BaseFont name.
    pub fn base_name(&self) -> &'static str {
        match self {
            Font::HelveticaBold => "Helvetica-Bold",
            Font::Helvetica => "Helvetica",
            Font::HelveticaOblique => "Helvetica-Oblique",
            Font::TimesRoman => "Times-Roman",
            Font::TimesItalic => "Times-Italic",
        }
    }

    /// Resource name used in content streams.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::HelveticaBold => "F1",
            Font::Helvetica => "F2",
            Font::HelveticaOblique => "F3",
            Font::TimesRoman => "F4",
            Font::TimesItalic => "F5",
        }
    }

    /// All faces, for building the page resource dictionary.
    pub fn all() -> [Font; 5] {
        [
            Font::HelveticaBold,
            Font::Helvetica,
            Font::HelveticaOblique,
            Font::TimesRoman,
            Font::TimesItalic,
        ]
    }
}

/// Width and height bounds in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Maximum width.
    pub width: f32,
    /// Maximum height.
    pub height: f32,
}

/// Full layout configuration: a 6x9 inch trim with half-inch margins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfStyle {
    /// Page width in points.
    pub page_width: f32,
    /// Page height in points.
    pub page_height: f32,
    /// Left and right margin in points.
    pub margin_horizontal: f32,
    /// Top and bottom margin in points.
    pub margin_vertical: f32,
    /// Cover pages use this near-zero margin instead.
    pub cover_margin: f32,
    /// Extra frame padding inside the margins.
    pub frame_padding: f32,
    /// Height reserved at the bottom for the page-number footer.
    pub footer_reserve: f32,
    /// Title size on the cover and title page.
    pub title_size: f32,
    /// Chapter heading size.
    pub chapter_size: f32,
    /// Body text size.
    pub body_size: f32,
    /// Caption size.
    pub caption_size: f32,
    /// Page-number footer size.
    pub page_number_size: f32,
    /// Table-of-contents title size.
    pub toc_title_size: f32,
    /// Table-of-contents entry size.
    pub toc_entry_size: f32,
    /// First-line paragraph indent in points.
    pub first_line_indent: f32,
    /// Line height multiplier over the font size.
    pub leading: f32,
    /// Vertical space after a paragraph.
    pub space_after: f32,
    /// Vertical space around kept-together poems.
    pub poem_spacer: f32,
}

impl Default for PdfStyle {
    fn default() -> Self {
        Self {
            page_width: 6.0 * INCH,
            page_height: 9.0 * INCH,
            margin_horizontal: 0.5 * INCH,
            margin_vertical: 0.5 * INCH,
            cover_margin: 0.05 * INCH,
            frame_padding: 0.2 * INCH,
            footer_reserve: 0.5 * INCH,
            title_size: 24.0,
            chapter_size: 18.0,
            body_size: 16.0,
            caption_size: 14.0,
            page_number_size: 12.0,
            toc_title_size: 20.0,
            toc_entry_size: 14.0,
            first_line_indent: 0.25 * INCH,
            leading: 1.3,
            space_after: 8.0,
            poem_spacer: 0.5 * INCH,
        }
    }
}

impl PdfStyle {
    /// Usable text width between margins and frame padding.
    pub fn frame_width(&self) -> f32 {
        self.page_width - 2.0 * (self.margin_horizontal + self.frame_padding)
    }

    /// Usable text height above the footer reserve.
    pub fn frame_height(&self) -> f32 {
        self.page_height - 2.0 * (self.margin_vertical + self.frame_padding) - self.footer_reserve
    }

    /// Cover pages run nearly full bleed.
    pub fn cover_frame(&self) -> Bounds {
        Bounds {
            width: self.page_width - 2.0 * self.cover_margin,
            height: self.page_height - 2.0 * self.cover_margin,
        }
    }

    /// Target bounds for an image layout before frame clamping.
    pub fn image_bounds(&self, layout: ImageLayout) -> Bounds {
        let default = Bounds {
            width: 4.0 * INCH,
            height: 3.0 * INCH,
        };
        match layout {
            ImageLayout::FullPage | ImageLayout::Spread => Bounds {
                width: 5.0 * INCH,
                height: 7.5 * INCH,
            },
            ImageLayout::ChapterOpener => Bounds {
                width: default.width * 1.2,
                height: default.height * 1.2,
            },
            ImageLayout::InlineLeft | ImageLayout::InlineRight => Bounds {
                width: default.width * 0.8,
                height: default.height * 0.8,
            },
            ImageLayout::Inline => default,
        }
    }

    /// Baseline-to-baseline distance for a font size.
    pub fn line_height(&self, size: f32) -> f32 {
        size * self.leading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trim_is_six_by_nine() {
        let style = PdfStyle::default();
        assert_eq!(style.page_width, 432.0);
        assert_eq!(style.page_height, 648.0);
    }

    #[test]
    fn frame_accounts_for_padding_and_footer() {
        let style = PdfStyle::default();
        assert!((style.frame_width() - 331.2).abs() < 0.01);
        assert!((style.frame_height() - 511.2).abs() < 0.01);
    }

    #[test]
    fn full_page_bounds_dominate_inline() {
        let style = PdfStyle::default();
        let full = style.image_bounds(ImageLayout::FullPage);
        let inline = style.image_bounds(ImageLayout::Inline);
        assert!(full.height > inline.height);
        assert_eq!(full.width, 360.0);
    }
}

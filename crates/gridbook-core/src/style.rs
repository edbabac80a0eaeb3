//! Style resolution and the writer-side style registry.
//!
//! Reading resolves a cell's style index into a [`ResolvedStyle`] snapshot;
//! writing registers [`CellStyle`] descriptions into a deduplicating
//! registry whose indices are assigned in first-use order.

use gridbook_xml::styles::{
    Alignment, Border, BorderSide, CellFormat, Color, Fill, Font, StylesInfo,
};

use crate::error::{Error, Result};

/// A fully resolved view of one cell-format record.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub num_fmt_id: u32,
    /// The custom format code, when the id maps to one.
    pub num_fmt_code: Option<String>,
    pub font: Font,
    pub fill: Fill,
    pub border: Border,
    pub alignment: Option<Alignment>,
    /// Whether this style renders numbers as dates.
    pub is_date: bool,
}

/// Resolve a style index against the style table.
///
/// An out-of-range style index is an error; out-of-range component ids
/// degrade to the empty component so a sheet still opens.
pub fn resolve_style(info: &StylesInfo, style_index: usize) -> Result<ResolvedStyle> {
    let format: &CellFormat =
        info.cell_formats
            .get(style_index)
            .ok_or(Error::StyleIndexOutOfRange {
                index: style_index,
                len: info.cell_formats.len(),
            })?;

    Ok(ResolvedStyle {
        num_fmt_id: format.num_fmt_id,
        num_fmt_code: info.num_fmt_code(format.num_fmt_id).map(|c| c.to_string()),
        font: info
            .fonts
            .get(format.font_id as usize)
            .cloned()
            .unwrap_or_default(),
        fill: info
            .fills
            .get(format.fill_id as usize)
            .cloned()
            .unwrap_or_else(Fill::none),
        border: info
            .borders
            .get(format.border_id as usize)
            .cloned()
            .unwrap_or_default(),
        alignment: format.alignment.clone(),
        is_date: info.is_date_format(style_index),
    })
}

/// A writer-facing style description.
///
/// Colors are ARGB hex strings; `border_style` applies one line style to
/// all four sides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub font_color: Option<String>,
    pub fill_color: Option<String>,
    pub border_style: Option<String>,
    pub number_format: Option<String>,
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
}

impl CellStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn font(mut self, name: &str, size: f64) -> Self {
        self.font_name = Some(name.to_string());
        self.font_size = Some(size);
        self
    }

    pub fn font_color(mut self, argb: &str) -> Self {
        self.font_color = Some(argb.to_string());
        self
    }

    pub fn fill(mut self, argb: &str) -> Self {
        self.fill_color = Some(argb.to_string());
        self
    }

    pub fn border(mut self, style: &str) -> Self {
        self.border_style = Some(style.to_string());
        self
    }

    pub fn number_format(mut self, code: &str) -> Self {
        self.number_format = Some(code.to_string());
        self
    }

    pub fn align(mut self, horizontal: &str) -> Self {
        self.horizontal = Some(horizontal.to_string());
        self
    }

    pub fn wrap(mut self) -> Self {
        self.wrap_text = true;
        self
    }
}

/// Deduplicating registry mapping [`CellStyle`] to stable style indices.
pub(crate) struct StyleRegistry {
    info: StylesInfo,
}

impl StyleRegistry {
    pub(crate) fn new() -> Self {
        Self {
            info: StylesInfo::default(),
        }
    }

    /// Register a style, returning its zero-based cell-format index.
    /// Identical styles return the same index.
    pub(crate) fn register(&mut self, style: &CellStyle) -> u32 {
        let font = Font {
            name: style.font_name.clone(),
            size: style.font_size,
            color: style.font_color.clone().map(Color::Rgb),
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
            strike: style.strike,
        };
        let font_id = intern(&mut self.info.fonts, font);

        let fill = match &style.fill_color {
            Some(argb) => Fill::solid(argb),
            None => Fill::none(),
        };
        let fill_id = match &style.fill_color {
            Some(_) => intern(&mut self.info.fills, fill),
            None => 0,
        };

        let border = match &style.border_style {
            Some(line) => {
                let side = || {
                    Some(BorderSide {
                        style: line.clone(),
                        color: None,
                    })
                };
                Border {
                    left: side(),
                    right: side(),
                    top: side(),
                    bottom: side(),
                    diagonal: None,
                }
            }
            None => Border::default(),
        };
        let border_id = intern(&mut self.info.borders, border);

        let num_fmt_id = match &style.number_format {
            Some(code) => self.info.add_num_fmt(code),
            None => 0,
        };

        let alignment = if style.horizontal.is_some() || style.vertical.is_some() || style.wrap_text
        {
            Some(Alignment {
                horizontal: style.horizontal.clone(),
                vertical: style.vertical.clone(),
                wrap_text: style.wrap_text,
                text_rotation: None,
                indent: None,
            })
        } else {
            None
        };

        let format = CellFormat {
            num_fmt_id,
            font_id,
            fill_id,
            border_id,
            alignment,
        };
        intern(&mut self.info.cell_formats, format)
    }

    pub(crate) fn into_info(self) -> StylesInfo {
        self.info
    }
}

/// Find-or-append into a component list, returning the index.
fn intern<T: PartialEq>(list: &mut Vec<T>, value: T) -> u32 {
    if let Some(pos) = list.iter().position(|v| *v == value) {
        return pos as u32;
    }
    list.push(value);
    (list.len() - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_deduplicates() {
        let mut registry = StyleRegistry::new();
        let bold = CellStyle::new().bold();
        let a = registry.register(&bold);
        let b = registry.register(&CellStyle::new().bold());
        assert_eq!(a, b);
        let c = registry.register(&CellStyle::new().italic());
        assert_ne!(a, c);
    }

    #[test]
    fn test_register_reuses_default_slots() {
        let mut registry = StyleRegistry::new();
        // A style identical to the implicit default maps to index 0.
        let idx = registry.register(&CellStyle::new());
        assert_eq!(idx, 0);
        assert_eq!(registry.into_info(), StylesInfo::default());
    }

    #[test]
    fn test_register_builds_components() {
        let mut registry = StyleRegistry::new();
        let style = CellStyle::new()
            .font("Arial", 14.0)
            .bold()
            .fill("FFFFFF00")
            .border("thin")
            .number_format("yyyy-mm-dd")
            .align("center")
            .wrap();
        let idx = registry.register(&style);
        assert_eq!(idx, 1);

        let info = registry.into_info();
        let xf = &info.cell_formats[1];
        assert_eq!(xf.num_fmt_id, 164);
        let font = &info.fonts[xf.font_id as usize];
        assert_eq!(font.name.as_deref(), Some("Arial"));
        assert!(font.bold);
        let fill = &info.fills[xf.fill_id as usize];
        assert_eq!(fill.pattern, "solid");
        let border = &info.borders[xf.border_id as usize];
        assert_eq!(border.left.as_ref().unwrap().style, "thin");
        let al = xf.alignment.as_ref().unwrap();
        assert_eq!(al.horizontal.as_deref(), Some("center"));
        assert!(al.wrap_text);
        assert!(info.is_date_format(1));
    }

    #[test]
    fn test_resolve_style() {
        let mut registry = StyleRegistry::new();
        let idx = registry.register(&CellStyle::new().font("Arial", 10.0).fill("FF112233"));
        let info = registry.into_info();

        let resolved = resolve_style(&info, idx as usize).unwrap();
        assert_eq!(resolved.font.name.as_deref(), Some("Arial"));
        assert_eq!(resolved.fill.pattern, "solid");
        assert!(!resolved.is_date);
        assert_eq!(resolved.num_fmt_id, 0);
    }

    #[test]
    fn test_resolve_style_out_of_range() {
        let info = StylesInfo::default();
        let err = resolve_style(&info, 5).unwrap_err();
        assert!(matches!(
            err,
            Error::StyleIndexOutOfRange { index: 5, len: 1 }
        ));
    }

    #[test]
    fn test_resolve_style_degrades_bad_component_ids() {
        let mut info = StylesInfo::default();
        info.cell_formats.push(CellFormat {
            font_id: 99,
            fill_id: 99,
            border_id: 99,
            ..CellFormat::default()
        });
        let resolved = resolve_style(&info, 1).unwrap();
        assert_eq!(resolved.font, Font::default());
        assert_eq!(resolved.fill, Fill::none());
        assert_eq!(resolved.border, Border::default());
    }
}

//! The style table (`xl/styles.xml`).
//!
//! Collects custom number formats, fonts, fills, borders, and the
//! `<cellXfs>` cell-format records. Indices into each list are zero-based
//! and stable; a cell's style index points into `cell_formats`.

use quick_xml::events::{BytesStart, Event};

use crate::namespaces::SPREADSHEET_ML;
use crate::sax::{self, Emitter};
use crate::Result;

/// First custom number-format id. Ids below this are built in.
pub const FIRST_CUSTOM_NUM_FMT_ID: u32 = 164;

/// A color: an ARGB hex string or a theme index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Color {
    Rgb(String),
    Theme(u32),
}

/// A font record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Font {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub color: Option<Color>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
}

/// A fill record (pattern fill only; gradient fills are preserved as `none`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fill {
    pub pattern: String,
    pub fg_color: Option<Color>,
    pub bg_color: Option<Color>,
}

impl Fill {
    pub fn none() -> Self {
        Self {
            pattern: "none".to_string(),
            ..Self::default()
        }
    }

    pub fn gray125() -> Self {
        Self {
            pattern: "gray125".to_string(),
            ..Self::default()
        }
    }

    pub fn solid(rgb: &str) -> Self {
        Self {
            pattern: "solid".to_string(),
            fg_color: Some(Color::Rgb(rgb.to_string())),
            bg_color: None,
        }
    }
}

/// One side of a border.
#[derive(Debug, Clone, PartialEq)]
pub struct BorderSide {
    pub style: String,
    pub color: Option<Color>,
}

/// A border record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Border {
    pub left: Option<BorderSide>,
    pub right: Option<BorderSide>,
    pub top: Option<BorderSide>,
    pub bottom: Option<BorderSide>,
    pub diagonal: Option<BorderSide>,
}

/// Nested alignment of a cell-format record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub text_rotation: Option<i32>,
    pub indent: Option<u32>,
}

/// A `<cellXfs>` record. The zero-based position is the style index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellFormat {
    pub num_fmt_id: u32,
    pub font_id: u32,
    pub fill_id: u32,
    pub border_id: u32,
    pub alignment: Option<Alignment>,
}

/// The parsed style table.
#[derive(Debug, Clone, PartialEq)]
pub struct StylesInfo {
    /// Custom number formats, ordered by id.
    pub num_fmts: Vec<(u32, String)>,
    pub fonts: Vec<Font>,
    pub fills: Vec<Fill>,
    pub borders: Vec<Border>,
    pub cell_formats: Vec<CellFormat>,
}

impl Default for StylesInfo {
    /// The table an absent `xl/styles.xml` behaves as: one empty font, the
    /// `none` and `gray125` fills, one empty border, one empty cell format.
    fn default() -> Self {
        Self {
            num_fmts: vec![],
            fonts: vec![Font::default()],
            fills: vec![Fill::none(), Fill::gray125()],
            borders: vec![Border::default()],
            cell_formats: vec![CellFormat::default()],
        }
    }
}

impl StylesInfo {
    /// Look up a custom number-format code by id.
    pub fn num_fmt_code(&self, id: u32) -> Option<&str> {
        self.num_fmts
            .iter()
            .find(|(fmt_id, _)| *fmt_id == id)
            .map(|(_, code)| code.as_str())
    }

    /// Register a custom number format, returning its id.
    pub fn add_num_fmt(&mut self, code: &str) -> u32 {
        if let Some((id, _)) = self.num_fmts.iter().find(|(_, c)| c == code) {
            return *id;
        }
        let id = self
            .num_fmts
            .iter()
            .map(|(id, _)| *id + 1)
            .max()
            .unwrap_or(FIRST_CUSTOM_NUM_FMT_ID);
        self.num_fmts.push((id, code.to_string()));
        id
    }

    /// Whether the cell format at `style_index` renders numbers as dates.
    pub fn is_date_format(&self, style_index: usize) -> bool {
        let Some(xf) = self.cell_formats.get(style_index) else {
            return false;
        };
        let id = xf.num_fmt_id;
        if (14..=22).contains(&id) {
            return true;
        }
        self.num_fmt_code(id).is_some_and(is_date_format_code)
    }
}

/// Whether a number-format code describes a date or time.
///
/// Built-in numeric prefixes (`#`, `0`, `?`) and the text format `@` are
/// never dates. Otherwise the code is scanned outside quoted literals for
/// `y`/`d`/`h`/`s`; a bare `m` only counts when a date/time separator is
/// also present, since without one it cannot be told from a minute token.
pub fn is_date_format_code(code: &str) -> bool {
    if code == "@" {
        return false;
    }
    if code.starts_with('#') || code.starts_with('0') || code.starts_with('?') {
        return false;
    }

    let mut in_quotes = false;
    let mut has_m = false;
    let mut has_separator = false;
    for c in code.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        match c.to_ascii_lowercase() {
            'y' | 'd' | 'h' | 's' => return true,
            'm' => has_m = true,
            '/' | '-' | ':' => has_separator = true,
            _ => {}
        }
    }
    has_m && has_separator
}

/// Parser context inside `xl/styles.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    NumFmts,
    Fonts,
    Font,
    Fills,
    Fill,
    PatternFill,
    Borders,
    Border,
    BorderSide(SideKind),
    CellXfs,
    Xf,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SideKind {
    Left,
    Right,
    Top,
    Bottom,
    Diagonal,
}

/// Parse an `xl/styles.xml` payload.
///
/// Only `<xf>` records inside `<cellXfs>` become cell formats; the
/// `<cellStyleXfs>` master records are skipped.
pub fn parse_styles(part: &str, data: &[u8]) -> Result<StylesInfo> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();

    let mut info = StylesInfo {
        num_fmts: vec![],
        fonts: vec![],
        fills: vec![],
        borders: vec![],
        cell_formats: vec![],
    };

    let mut stack: Vec<Ctx> = Vec::new();
    let mut font = Font::default();
    let mut fill = Fill::default();
    let mut border = Border::default();
    let mut side: Option<BorderSide> = None;
    let mut xf = CellFormat::default();

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| crate::Error::malformed(part, e))?;
        match event {
            Event::Start(ref e) => {
                let ctx = start_context(&stack, e);
                match ctx {
                    Ctx::Font => font = Font::default(),
                    Ctx::Fill => fill = Fill::none(),
                    Ctx::PatternFill => {
                        if let Some(p) = sax::attr(part, e, "patternType")? {
                            fill.pattern = p;
                        }
                    }
                    Ctx::Border => border = Border::default(),
                    Ctx::BorderSide(_) => {
                        side = sax::attr(part, e, "style")?.map(|style| BorderSide {
                            style,
                            color: None,
                        });
                    }
                    Ctx::Xf => xf = parse_xf(part, e)?,
                    Ctx::Other => apply_leaf(
                        part, e, &stack, &mut info, &mut font, &mut fill, &mut side, &mut xf,
                    )?,
                    _ => {}
                }
                stack.push(ctx);
            }
            Event::Empty(ref e) => {
                let ctx = start_context(&stack, e);
                match ctx {
                    Ctx::Font => info.fonts.push(Font::default()),
                    Ctx::Border => info.borders.push(Border::default()),
                    Ctx::BorderSide(kind) => {
                        let parsed = sax::attr(part, e, "style")?.map(|style| BorderSide {
                            style,
                            color: None,
                        });
                        assign_side(&mut border, kind, parsed);
                    }
                    Ctx::Xf if stack.last() == Some(&Ctx::CellXfs) => {
                        info.cell_formats.push(parse_xf(part, e)?);
                    }
                    _ => apply_leaf(
                        part, e, &stack, &mut info, &mut font, &mut fill, &mut side, &mut xf,
                    )?,
                }
            }
            Event::End(_) => {
                match stack.pop() {
                    Some(Ctx::Font) => info.fonts.push(std::mem::take(&mut font)),
                    Some(Ctx::Fill) => info.fills.push(std::mem::take(&mut fill)),
                    Some(Ctx::Border) => info.borders.push(std::mem::take(&mut border)),
                    Some(Ctx::BorderSide(kind)) => assign_side(&mut border, kind, side.take()),
                    Some(Ctx::Xf) => {
                        if stack.last() == Some(&Ctx::CellXfs) {
                            info.cell_formats.push(std::mem::take(&mut xf));
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // An empty or partial table falls back to the defaults for whatever is
    // missing so indices keep resolving.
    let defaults = StylesInfo::default();
    if info.fonts.is_empty() {
        info.fonts = defaults.fonts;
    }
    if info.fills.is_empty() {
        info.fills = defaults.fills;
    }
    if info.borders.is_empty() {
        info.borders = defaults.borders;
    }
    if info.cell_formats.is_empty() {
        info.cell_formats = defaults.cell_formats;
    }

    Ok(info)
}

fn start_context(stack: &[Ctx], e: &BytesStart) -> Ctx {
    let parent = stack.last().copied();
    match e.local_name().as_ref() {
        b"numFmts" => Ctx::NumFmts,
        b"fonts" => Ctx::Fonts,
        b"font" if parent == Some(Ctx::Fonts) => Ctx::Font,
        b"fills" => Ctx::Fills,
        b"fill" if parent == Some(Ctx::Fills) => Ctx::Fill,
        b"patternFill" if parent == Some(Ctx::Fill) => Ctx::PatternFill,
        b"borders" => Ctx::Borders,
        b"border" if parent == Some(Ctx::Borders) => Ctx::Border,
        b"left" if parent == Some(Ctx::Border) => Ctx::BorderSide(SideKind::Left),
        b"right" if parent == Some(Ctx::Border) => Ctx::BorderSide(SideKind::Right),
        b"top" if parent == Some(Ctx::Border) => Ctx::BorderSide(SideKind::Top),
        b"bottom" if parent == Some(Ctx::Border) => Ctx::BorderSide(SideKind::Bottom),
        b"diagonal" if parent == Some(Ctx::Border) => Ctx::BorderSide(SideKind::Diagonal),
        b"cellXfs" => Ctx::CellXfs,
        b"xf" if parent == Some(Ctx::CellXfs) => Ctx::Xf,
        _ => Ctx::Other,
    }
}

fn assign_side(border: &mut Border, kind: SideKind, side: Option<BorderSide>) {
    match kind {
        SideKind::Left => border.left = side,
        SideKind::Right => border.right = side,
        SideKind::Top => border.top = side,
        SideKind::Bottom => border.bottom = side,
        SideKind::Diagonal => border.diagonal = side,
    }
}

fn parse_xf(part: &str, e: &BytesStart) -> Result<CellFormat> {
    let num = |name: &str| -> Result<u32> {
        match sax::attr(part, e, name)? {
            Some(v) => sax::parse_num(name, &v),
            None => Ok(0),
        }
    };
    Ok(CellFormat {
        num_fmt_id: num("numFmtId")?,
        font_id: num("fontId")?,
        fill_id: num("fillId")?,
        border_id: num("borderId")?,
        alignment: None,
    })
}

/// Handle an empty leaf element in whatever context is current.
#[allow(clippy::too_many_arguments)]
fn apply_leaf(
    part: &str,
    e: &BytesStart,
    stack: &[Ctx],
    info: &mut StylesInfo,
    font: &mut Font,
    fill: &mut Fill,
    side: &mut Option<BorderSide>,
    xf: &mut CellFormat,
) -> Result<()> {
    let parent = stack.last().copied();
    match (e.local_name().as_ref(), parent) {
        (b"numFmt", Some(Ctx::NumFmts)) => {
            let id: u32 = sax::parse_num("numFmtId", &sax::require_attr(part, e, "numFmtId")?)?;
            let code = sax::require_attr(part, e, "formatCode")?;
            info.num_fmts.push((id, code));
        }
        (b"name", Some(Ctx::Font)) => font.name = sax::attr(part, e, "val")?,
        (b"sz", Some(Ctx::Font)) => {
            if let Some(v) = sax::attr(part, e, "val")? {
                font.size = Some(sax::parse_num("val", &v)?);
            }
        }
        (b"b", Some(Ctx::Font)) => font.bold = flag(part, e)?,
        (b"i", Some(Ctx::Font)) => font.italic = flag(part, e)?,
        (b"u", Some(Ctx::Font)) => font.underline = flag(part, e)?,
        (b"strike", Some(Ctx::Font)) => font.strike = flag(part, e)?,
        (b"color", Some(Ctx::Font)) => font.color = parse_color(part, e)?,
        (b"fgColor", Some(Ctx::PatternFill)) => fill.fg_color = parse_color(part, e)?,
        (b"bgColor", Some(Ctx::PatternFill)) => fill.bg_color = parse_color(part, e)?,
        (b"color", Some(Ctx::BorderSide(_))) => {
            if let Some(s) = side.as_mut() {
                s.color = parse_color(part, e)?;
            }
        }
        (b"alignment", Some(Ctx::Xf)) => {
            xf.alignment = Some(Alignment {
                horizontal: sax::attr(part, e, "horizontal")?,
                vertical: sax::attr(part, e, "vertical")?,
                wrap_text: sax::attr(part, e, "wrapText")?
                    .map(|v| sax::parse_bool(&v))
                    .unwrap_or(false),
                text_rotation: match sax::attr(part, e, "textRotation")? {
                    Some(v) => Some(sax::parse_num("textRotation", &v)?),
                    None => None,
                },
                indent: match sax::attr(part, e, "indent")? {
                    Some(v) => Some(sax::parse_num("indent", &v)?),
                    None => None,
                },
            });
        }
        _ => {}
    }
    Ok(())
}

fn flag(part: &str, e: &BytesStart) -> Result<bool> {
    Ok(sax::attr(part, e, "val")?
        .map(|v| sax::parse_bool(&v))
        .unwrap_or(true))
}

fn parse_color(part: &str, e: &BytesStart) -> Result<Option<Color>> {
    if let Some(rgb) = sax::attr(part, e, "rgb")? {
        return Ok(Some(Color::Rgb(rgb)));
    }
    if let Some(theme) = sax::attr(part, e, "theme")? {
        return Ok(Some(Color::Theme(sax::parse_num("theme", &theme)?)));
    }
    Ok(None)
}

// -------------------------------------------------------------------------
// Builder
// -------------------------------------------------------------------------

/// Serialize a style table back to XML.
pub fn write_styles(info: &StylesInfo) -> Result<Vec<u8>> {
    let mut em = Emitter::new()?;
    em.start(sax::element("styleSheet", &[("xmlns", SPREADSHEET_ML)]))?;

    if !info.num_fmts.is_empty() {
        em.start(sax::element(
            "numFmts",
            &[("count", &info.num_fmts.len().to_string())],
        ))?;
        for (id, code) in &info.num_fmts {
            em.empty(sax::element(
                "numFmt",
                &[("numFmtId", &id.to_string()), ("formatCode", code)],
            ))?;
        }
        em.end("numFmts")?;
    }

    em.start(sax::element(
        "fonts",
        &[("count", &info.fonts.len().to_string())],
    ))?;
    for font in &info.fonts {
        write_font(&mut em, font)?;
    }
    em.end("fonts")?;

    em.start(sax::element(
        "fills",
        &[("count", &info.fills.len().to_string())],
    ))?;
    for fill in &info.fills {
        write_fill(&mut em, fill)?;
    }
    em.end("fills")?;

    em.start(sax::element(
        "borders",
        &[("count", &info.borders.len().to_string())],
    ))?;
    for border in &info.borders {
        write_border(&mut em, border)?;
    }
    em.end("borders")?;

    em.start(sax::element(
        "cellXfs",
        &[("count", &info.cell_formats.len().to_string())],
    ))?;
    for xf in &info.cell_formats {
        write_xf(&mut em, xf)?;
    }
    em.end("cellXfs")?;

    em.end("styleSheet")?;
    Ok(em.into_bytes())
}

fn color_attrs(color: &Color) -> (&'static str, String) {
    match color {
        Color::Rgb(rgb) => ("rgb", rgb.clone()),
        Color::Theme(idx) => ("theme", idx.to_string()),
    }
}

fn write_color(em: &mut Emitter, name: &str, color: &Color) -> Result<()> {
    let (key, value) = color_attrs(color);
    em.empty(sax::element(name, &[(key, &value)]))
}

fn write_font(em: &mut Emitter, font: &Font) -> Result<()> {
    let empty = *font == Font::default();
    if empty {
        return em.empty(sax::element("font", &[]));
    }
    em.start(sax::element("font", &[]))?;
    if font.bold {
        em.empty(sax::element("b", &[]))?;
    }
    if font.italic {
        em.empty(sax::element("i", &[]))?;
    }
    if font.underline {
        em.empty(sax::element("u", &[]))?;
    }
    if font.strike {
        em.empty(sax::element("strike", &[]))?;
    }
    if let Some(size) = font.size {
        em.empty(sax::element("sz", &[("val", &size.to_string())]))?;
    }
    if let Some(color) = &font.color {
        write_color(em, "color", color)?;
    }
    if let Some(name) = &font.name {
        em.empty(sax::element("name", &[("val", name)]))?;
    }
    em.end("font")
}

fn write_fill(em: &mut Emitter, fill: &Fill) -> Result<()> {
    em.start(sax::element("fill", &[]))?;
    if fill.fg_color.is_none() && fill.bg_color.is_none() {
        em.empty(sax::element("patternFill", &[("patternType", &fill.pattern)]))?;
    } else {
        em.start(sax::element("patternFill", &[("patternType", &fill.pattern)]))?;
        if let Some(fg) = &fill.fg_color {
            write_color(em, "fgColor", fg)?;
        }
        if let Some(bg) = &fill.bg_color {
            write_color(em, "bgColor", bg)?;
        }
        em.end("patternFill")?;
    }
    em.end("fill")
}

fn write_border(em: &mut Emitter, border: &Border) -> Result<()> {
    em.start(sax::element("border", &[]))?;
    for (name, side) in [
        ("left", &border.left),
        ("right", &border.right),
        ("top", &border.top),
        ("bottom", &border.bottom),
        ("diagonal", &border.diagonal),
    ] {
        match side {
            Some(side) => {
                if let Some(color) = &side.color {
                    em.start(sax::element(name, &[("style", &side.style)]))?;
                    write_color(em, "color", color)?;
                    em.end(name)?;
                } else {
                    em.empty(sax::element(name, &[("style", &side.style)]))?;
                }
            }
            None => em.empty(sax::element(name, &[]))?,
        }
    }
    em.end("border")
}

fn write_xf(em: &mut Emitter, xf: &CellFormat) -> Result<()> {
    let num_fmt_id = xf.num_fmt_id.to_string();
    let font_id = xf.font_id.to_string();
    let fill_id = xf.fill_id.to_string();
    let border_id = xf.border_id.to_string();
    let mut attrs: Vec<(&str, &str)> = vec![
        ("numFmtId", num_fmt_id.as_str()),
        ("fontId", font_id.as_str()),
        ("fillId", fill_id.as_str()),
        ("borderId", border_id.as_str()),
    ];
    if xf.num_fmt_id != 0 {
        attrs.push(("applyNumberFormat", "1"));
    }
    if xf.font_id != 0 {
        attrs.push(("applyFont", "1"));
    }
    if xf.fill_id != 0 {
        attrs.push(("applyFill", "1"));
    }
    if xf.border_id != 0 {
        attrs.push(("applyBorder", "1"));
    }
    if xf.alignment.is_some() {
        attrs.push(("applyAlignment", "1"));
    }

    match &xf.alignment {
        None => em.empty(sax::element("xf", &attrs)),
        Some(al) => {
            em.start(sax::element("xf", &attrs))?;
            let mut al_attrs: Vec<(&str, String)> = vec![];
            if let Some(h) = &al.horizontal {
                al_attrs.push(("horizontal", h.clone()));
            }
            if let Some(v) = &al.vertical {
                al_attrs.push(("vertical", v.clone()));
            }
            if al.wrap_text {
                al_attrs.push(("wrapText", "1".to_string()));
            }
            if let Some(r) = al.text_rotation {
                al_attrs.push(("textRotation", r.to_string()));
            }
            if let Some(i) = al.indent {
                al_attrs.push(("indent", i.to_string()));
            }
            let borrowed: Vec<(&str, &str)> =
                al_attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
            em.empty(sax::element("alignment", &borrowed))?;
            em.end("xf")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART: &str = "xl/styles.xml";

    fn parse(xml: &str) -> StylesInfo {
        parse_styles(PART, xml.as_bytes()).unwrap()
    }

    // ----- parsing --------------------------------------------------------

    #[test]
    fn test_parse_fonts_with_contextual_colors() {
        let info = parse(
            r#"<styleSheet xmlns="x">
  <fonts count="2">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><i val="0"/><color rgb="FFFF0000"/><sz val="14"/><name val="Arial"/></font>
  </fonts>
  <fills count="1">
    <fill><patternFill patternType="solid"><fgColor rgb="FF00FF00"/></patternFill></fill>
  </fills>
</styleSheet>"#,
        );
        assert_eq!(info.fonts.len(), 2);
        assert_eq!(info.fonts[0].name.as_deref(), Some("Calibri"));
        assert!(!info.fonts[0].bold);
        assert!(info.fonts[1].bold);
        assert!(!info.fonts[1].italic);
        assert_eq!(info.fonts[1].color, Some(Color::Rgb("FFFF0000".to_string())));
        // The <fgColor> inside the fill never leaks into a font.
        assert_eq!(info.fills[0].fg_color, Some(Color::Rgb("FF00FF00".to_string())));
        assert_eq!(info.fills[0].pattern, "solid");
    }

    #[test]
    fn test_parse_cell_xfs_only() {
        let info = parse(
            r#"<styleSheet xmlns="x">
  <cellStyleXfs count="1"><xf numFmtId="9" fontId="5" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="14" fontId="1" fillId="2" borderId="1">
      <alignment horizontal="center" vertical="top" wrapText="1" textRotation="45" indent="2"/>
    </xf>
  </cellXfs>
</styleSheet>"#,
        );
        // cellStyleXfs records are not collected.
        assert_eq!(info.cell_formats.len(), 2);
        assert_eq!(info.cell_formats[0], CellFormat::default());
        let xf = &info.cell_formats[1];
        assert_eq!(xf.num_fmt_id, 14);
        assert_eq!(xf.font_id, 1);
        assert_eq!(xf.fill_id, 2);
        assert_eq!(xf.border_id, 1);
        let al = xf.alignment.as_ref().unwrap();
        assert_eq!(al.horizontal.as_deref(), Some("center"));
        assert_eq!(al.vertical.as_deref(), Some("top"));
        assert!(al.wrap_text);
        assert_eq!(al.text_rotation, Some(45));
        assert_eq!(al.indent, Some(2));
    }

    #[test]
    fn test_parse_num_fmts() {
        let info = parse(
            r##"<styleSheet xmlns="x">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="yyyy-mm-dd"/>
    <numFmt numFmtId="165" formatCode="#,##0.00"/>
  </numFmts>
</styleSheet>"##,
        );
        assert_eq!(info.num_fmt_code(164), Some("yyyy-mm-dd"));
        assert_eq!(info.num_fmt_code(165), Some("#,##0.00"));
        assert_eq!(info.num_fmt_code(166), None);
    }

    #[test]
    fn test_parse_borders() {
        let info = parse(
            r#"<styleSheet xmlns="x">
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border>
      <left style="thin"><color rgb="FF000000"/></left>
      <right style="thick"/>
      <top/><bottom/><diagonal/>
    </border>
  </borders>
</styleSheet>"#,
        );
        assert_eq!(info.borders.len(), 2);
        assert_eq!(info.borders[0], Border::default());
        let b = &info.borders[1];
        assert_eq!(b.left.as_ref().unwrap().style, "thin");
        assert_eq!(
            b.left.as_ref().unwrap().color,
            Some(Color::Rgb("FF000000".to_string()))
        );
        assert_eq!(b.right.as_ref().unwrap().style, "thick");
        assert!(b.top.is_none());
    }

    #[test]
    fn test_empty_stylesheet_gets_defaults() {
        let info = parse(r#"<styleSheet xmlns="x"/>"#);
        assert_eq!(info, StylesInfo::default());
        assert_eq!(info.fills[1].pattern, "gray125");
    }

    // ----- date detection -------------------------------------------------

    #[test]
    fn test_builtin_date_ids() {
        let mut info = StylesInfo::default();
        for id in 14..=22 {
            info.cell_formats = vec![CellFormat {
                num_fmt_id: id,
                ..CellFormat::default()
            }];
            assert!(info.is_date_format(0), "numFmtId {id} should be a date");
        }
        info.cell_formats = vec![CellFormat {
            num_fmt_id: 13,
            ..CellFormat::default()
        }];
        assert!(!info.is_date_format(0));
    }

    #[test]
    fn test_date_format_codes() {
        assert!(is_date_format_code("yyyy-mm-dd"));
        assert!(is_date_format_code("m/d/yy"));
        assert!(is_date_format_code("h:mm AM/PM"));
        assert!(is_date_format_code("dd mmmm yyyy"));
        assert!(!is_date_format_code("#,##0.00"));
        assert!(!is_date_format_code("0.00%"));
        assert!(!is_date_format_code("@"));
        assert!(!is_date_format_code("?/?"));
        // A quoted y does not make a format a date.
        assert!(!is_date_format_code("\"y\"mm"));
    }

    #[test]
    fn test_is_date_format_out_of_range_index() {
        let info = StylesInfo::default();
        assert!(!info.is_date_format(99));
    }

    #[test]
    fn test_custom_date_format_via_style() {
        let mut info = StylesInfo::default();
        info.num_fmts.push((164, "yyyy-mm-dd".to_string()));
        info.cell_formats.push(CellFormat {
            num_fmt_id: 164,
            ..CellFormat::default()
        });
        assert!(info.is_date_format(1));
        assert!(!info.is_date_format(0));
    }

    // ----- num fmt registry ----------------------------------------------

    #[test]
    fn test_add_num_fmt_allocates_from_164() {
        let mut info = StylesInfo::default();
        assert_eq!(info.add_num_fmt("yyyy-mm-dd"), 164);
        assert_eq!(info.add_num_fmt("0.00%"), 165);
        // Re-registering returns the existing id.
        assert_eq!(info.add_num_fmt("yyyy-mm-dd"), 164);
    }

    // ----- round-trip -----------------------------------------------------

    #[test]
    fn test_roundtrip() {
        let mut info = StylesInfo::default();
        info.num_fmts.push((164, "yyyy-mm-dd".to_string()));
        info.fonts.push(Font {
            name: Some("Arial".to_string()),
            size: Some(14.0),
            color: Some(Color::Rgb("FFFF0000".to_string())),
            bold: true,
            ..Font::default()
        });
        info.fills.push(Fill::solid("FFFFFF00"));
        info.borders.push(Border {
            left: Some(BorderSide {
                style: "thin".to_string(),
                color: Some(Color::Rgb("FF000000".to_string())),
            }),
            bottom: Some(BorderSide {
                style: "double".to_string(),
                color: None,
            }),
            ..Border::default()
        });
        info.cell_formats.push(CellFormat {
            num_fmt_id: 164,
            font_id: 1,
            fill_id: 2,
            border_id: 1,
            alignment: Some(Alignment {
                horizontal: Some("center".to_string()),
                wrap_text: true,
                ..Alignment::default()
            }),
        });

        let bytes = write_styles(&info).unwrap();
        let parsed = parse_styles(PART, &bytes).unwrap();
        assert_eq!(parsed, info);
    }
}

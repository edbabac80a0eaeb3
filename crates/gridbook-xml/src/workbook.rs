//! The workbook part (`xl/workbook.xml`).
//!
//! Carries the ordered sheet list (name, internal id, relationship id,
//! visibility), workbook-scoped defined names, and workbook protection.

use quick_xml::events::Event;

use crate::namespaces::{RELATIONSHIPS, SPREADSHEET_ML};
use crate::sax::{self, Emitter};
use crate::Result;

/// Sheet visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetState::Visible => "visible",
            SheetState::Hidden => "hidden",
            SheetState::VeryHidden => "veryHidden",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }
}

/// One `<sheet>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub name: String,
    pub sheet_id: u32,
    /// Relationship id resolved through `xl/_rels/workbook.xml.rels`.
    pub rel_id: String,
    pub state: SheetState,
}

/// One `<definedName>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    /// The refers-to expression, e.g. `'My Sheet'!$A$1:$B$5`.
    pub refers_to: String,
    /// Sheet scope (`localSheetId`), if the name is sheet-local.
    pub local_sheet_id: Option<u32>,
}

/// `<workbookProtection>` attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookProtection {
    pub password_hash: Option<String>,
    pub lock_structure: bool,
    pub lock_windows: bool,
}

/// The parsed workbook part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkbookInfo {
    pub sheets: Vec<SheetInfo>,
    pub defined_names: Vec<DefinedName>,
    pub protection: Option<WorkbookProtection>,
}

impl WorkbookInfo {
    pub fn sheet_named(&self, name: &str) -> Option<&SheetInfo> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn defined_name(&self, name: &str) -> Option<&DefinedName> {
        self.defined_names.iter().find(|d| d.name == name)
    }
}

/// Parse an `xl/workbook.xml` payload.
pub fn parse_workbook(part: &str, data: &[u8]) -> Result<WorkbookInfo> {
    let mut reader = sax::reader(data);
    let mut buf = Vec::new();
    let mut info = WorkbookInfo::default();

    let mut in_defined_name = false;
    let mut pending_name: Option<DefinedName> = None;
    let mut text = String::new();

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| crate::Error::malformed(part, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let rel_id = sax::attr_local(part, e, "id")?.ok_or_else(|| {
                        crate::Error::missing_attribute("sheet", "r:id")
                    })?;
                    info.sheets.push(SheetInfo {
                        name: sax::require_attr(part, e, "name")?,
                        sheet_id: sax::parse_num(
                            "sheetId",
                            &sax::require_attr(part, e, "sheetId")?,
                        )?,
                        rel_id,
                        state: SheetState::from_str(
                            sax::attr(part, e, "state")?.as_deref().unwrap_or("visible"),
                        ),
                    });
                }
                b"definedName" => {
                    let name = sax::require_attr(part, e, "name")?;
                    let local_sheet_id = match sax::attr(part, e, "localSheetId")? {
                        Some(v) => Some(sax::parse_num("localSheetId", &v)?),
                        None => None,
                    };
                    let dn = DefinedName {
                        name,
                        refers_to: String::new(),
                        local_sheet_id,
                    };
                    if matches!(event, Event::Start(_)) {
                        pending_name = Some(dn);
                        in_defined_name = true;
                        text.clear();
                    } else {
                        info.defined_names.push(dn);
                    }
                }
                b"workbookProtection" => {
                    info.protection = Some(WorkbookProtection {
                        password_hash: sax::attr(part, e, "workbookPassword")?,
                        lock_structure: sax::attr(part, e, "lockStructure")?
                            .map(|v| sax::parse_bool(&v))
                            .unwrap_or(false),
                        lock_windows: sax::attr(part, e, "lockWindows")?
                            .map(|v| sax::parse_bool(&v))
                            .unwrap_or(false),
                    });
                }
                _ => {}
            },
            Event::Text(ref t) => {
                if in_defined_name {
                    text.push_str(&t.unescape().map_err(|e| crate::Error::malformed(part, e))?);
                }
            }
            Event::End(ref e) => {
                if e.local_name().as_ref() == b"definedName" && in_defined_name {
                    in_defined_name = false;
                    if let Some(mut dn) = pending_name.take() {
                        dn.refers_to = std::mem::take(&mut text);
                        info.defined_names.push(dn);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if info.sheets.is_empty() {
        return Err(crate::Error::missing_element(part, "sheet"));
    }
    Ok(info)
}

/// Serialize a workbook part.
pub fn write_workbook(info: &WorkbookInfo) -> Result<Vec<u8>> {
    let mut em = Emitter::new()?;
    em.start(sax::element(
        "workbook",
        &[("xmlns", SPREADSHEET_ML), ("xmlns:r", RELATIONSHIPS)],
    ))?;

    if let Some(p) = &info.protection {
        let mut attrs: Vec<(&str, String)> = vec![];
        if let Some(hash) = &p.password_hash {
            attrs.push(("workbookPassword", hash.clone()));
        }
        if p.lock_structure {
            attrs.push(("lockStructure", "1".to_string()));
        }
        if p.lock_windows {
            attrs.push(("lockWindows", "1".to_string()));
        }
        let borrowed: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        em.empty(sax::element("workbookProtection", &borrowed))?;
    }

    em.start(sax::element("sheets", &[]))?;
    for sheet in &info.sheets {
        let sheet_id = sheet.sheet_id.to_string();
        let mut attrs: Vec<(&str, &str)> = vec![
            ("name", &sheet.name),
            ("sheetId", &sheet_id),
            ("r:id", &sheet.rel_id),
        ];
        if sheet.state != SheetState::Visible {
            attrs.push(("state", sheet.state.as_str()));
        }
        em.empty(sax::element("sheet", &attrs))?;
    }
    em.end("sheets")?;

    if !info.defined_names.is_empty() {
        em.start(sax::element("definedNames", &[]))?;
        for dn in &info.defined_names {
            let mut attrs: Vec<(&str, String)> = vec![("name", dn.name.clone())];
            if let Some(id) = dn.local_sheet_id {
                attrs.push(("localSheetId", id.to_string()));
            }
            let borrowed: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
            em.start(sax::element("definedName", &borrowed))?;
            em.text(&dn.refers_to)?;
            em.end("definedName")?;
        }
        em.end("definedNames")?;
    }

    em.end("workbook")?;
    Ok(em.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART: &str = "xl/workbook.xml";

    #[test]
    fn test_parse_sheets_and_states() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
    <sheet name="Archive" sheetId="2" r:id="rId2" state="hidden"/>
    <sheet name="Internal" sheetId="3" r:id="rId3" state="veryHidden"/>
  </sheets>
</workbook>"#;
        let info = parse_workbook(PART, xml).unwrap();
        assert_eq!(info.sheets.len(), 3);
        assert_eq!(info.sheets[0].name, "Data");
        assert_eq!(info.sheets[0].state, SheetState::Visible);
        assert_eq!(info.sheets[1].state, SheetState::Hidden);
        assert_eq!(info.sheets[2].state, SheetState::VeryHidden);
        assert_eq!(info.sheet_named("Archive").unwrap().rel_id, "rId2");
    }

    #[test]
    fn test_parse_defined_names_and_protection() {
        let xml = br#"<workbook xmlns="x" xmlns:r="r">
  <workbookProtection workbookPassword="CAFE" lockStructure="1"/>
  <sheets><sheet name="S1" sheetId="1" r:id="rId1"/></sheets>
  <definedNames>
    <definedName name="Totals">'S1'!$A$1:$B$5</definedName>
    <definedName name="_xlnm.Print_Area" localSheetId="0">S1!$A$1:$C$10</definedName>
  </definedNames>
</workbook>"#;
        let info = parse_workbook(PART, xml).unwrap();
        let p = info.protection.as_ref().unwrap();
        assert_eq!(p.password_hash.as_deref(), Some("CAFE"));
        assert!(p.lock_structure);
        assert!(!p.lock_windows);

        assert_eq!(info.defined_names.len(), 2);
        assert_eq!(
            info.defined_name("Totals").unwrap().refers_to,
            "'S1'!$A$1:$B$5"
        );
        assert_eq!(
            info.defined_names[1].local_sheet_id,
            Some(0)
        );
    }

    #[test]
    fn test_workbook_without_sheets_is_invalid() {
        let xml = br#"<workbook xmlns="x"><sheets/></workbook>"#;
        let err = parse_workbook(PART, xml).unwrap_err();
        assert!(err.to_string().contains("sheet"));
    }

    #[test]
    fn test_sheet_missing_rel_id() {
        let xml = br#"<workbook xmlns="x"><sheets><sheet name="S" sheetId="1"/></sheets></workbook>"#;
        let err = parse_workbook(PART, xml).unwrap_err();
        assert!(err.to_string().contains("r:id"));
    }

    #[test]
    fn test_roundtrip() {
        let info = WorkbookInfo {
            sheets: vec![
                SheetInfo {
                    name: "Data".to_string(),
                    sheet_id: 1,
                    rel_id: "rId1".to_string(),
                    state: SheetState::Visible,
                },
                SheetInfo {
                    name: "Hidden".to_string(),
                    sheet_id: 2,
                    rel_id: "rId2".to_string(),
                    state: SheetState::Hidden,
                },
            ],
            defined_names: vec![DefinedName {
                name: "Totals".to_string(),
                refers_to: "'Data'!$A$1:$B$2".to_string(),
                local_sheet_id: None,
            }],
            protection: Some(WorkbookProtection {
                password_hash: None,
                lock_structure: true,
                lock_windows: false,
            }),
        };
        let bytes = write_workbook(&info).unwrap();
        let parsed = parse_workbook(PART, &bytes).unwrap();
        assert_eq!(parsed, info);
    }
}

//! Package part-path algebra.
//!
//! Part paths are absolute, slash-prefixed, and case-sensitive; they are
//! compared as raw strings. The helpers here derive companion `.rels` paths
//! and resolve relationship targets against a source part's directory.

/// Normalize a part path to its archive entry name (no leading slash).
pub(crate) fn entry_name(part_path: &str) -> &str {
    part_path.strip_prefix('/').unwrap_or(part_path)
}

/// The companion relationships path of a part: `_rels/` is inserted before
/// the filename and `.rels` appended.
///
/// `/xl/workbook.xml` -> `/xl/_rels/workbook.xml.rels`; the package root
/// (`/`) maps to `/_rels/.rels`.
pub(crate) fn rels_path_for(part_path: &str) -> String {
    let normalized = entry_name(part_path);
    let (dir, file) = normalized.rsplit_once('/').unwrap_or(("", normalized));
    if dir.is_empty() {
        format!("/_rels/{file}.rels")
    } else {
        format!("/{dir}/_rels/{file}.rels")
    }
}

/// Resolve a relationship target against the source part's directory.
///
/// `..` walks one level up, `.` is a no-op, and a leading `/` makes the
/// target absolute. The result is an absolute part path.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return format!("/{absolute}");
    }

    let base_dir = entry_name(source_part)
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or_default();
    let mut parts: Vec<&str> = if base_dir.is_empty() {
        vec![]
    } else {
        base_dir.split('/').collect()
    };

    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(seg),
        }
    }

    format!("/{}", parts.join("/"))
}

/// Build a relative relationship target from `source_part` to `target_part`.
pub(crate) fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir = entry_name(source_part)
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or_default();
    let source_parts: Vec<&str> = if source_dir.is_empty() {
        vec![]
    } else {
        source_dir.split('/').collect()
    };
    let target_parts: Vec<&str> = entry_name(target_part).split('/').collect();

    let mut common = 0usize;
    while common < source_parts.len()
        && common < target_parts.len()
        && source_parts[common] == target_parts[common]
    {
        common += 1;
    }

    let mut rel_parts: Vec<String> = Vec::new();
    for _ in 0..(source_parts.len() - common) {
        rel_parts.push("..".to_string());
    }
    rel_parts.extend(target_parts[common..].iter().map(|s| s.to_string()));

    if rel_parts.is_empty() {
        ".".to_string()
    } else {
        rel_parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for("/xl/workbook.xml"), "/xl/_rels/workbook.xml.rels");
        assert_eq!(
            rels_path_for("/xl/worksheets/sheet1.xml"),
            "/xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(rels_path_for("/"), "/_rels/.rels");
    }

    #[test]
    fn test_resolve_target_relative() {
        assert_eq!(
            resolve_target("/xl/workbook.xml", "worksheets/sheet1.xml"),
            "/xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("/xl/worksheets/sheet1.xml", "../comments1.xml"),
            "/xl/comments1.xml"
        );
        assert_eq!(
            resolve_target("/xl/worksheets/sheet1.xml", "./table1.xml"),
            "/xl/worksheets/table1.xml"
        );
    }

    #[test]
    fn test_resolve_target_absolute() {
        assert_eq!(
            resolve_target("/xl/worksheets/sheet1.xml", "/xl/styles.xml"),
            "/xl/styles.xml"
        );
    }

    #[test]
    fn test_resolve_target_from_root() {
        assert_eq!(resolve_target("/", "xl/workbook.xml"), "/xl/workbook.xml");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(
            relative_target("/xl/workbook.xml", "/xl/worksheets/sheet1.xml"),
            "worksheets/sheet1.xml"
        );
        assert_eq!(
            relative_target("/xl/worksheets/sheet1.xml", "/xl/comments1.xml"),
            "../comments1.xml"
        );
        assert_eq!(
            relative_target("/xl/worksheets/sheet1.xml", "/xl/drawings/vmlDrawing1.vml"),
            "../drawings/vmlDrawing1.vml"
        );
    }
}

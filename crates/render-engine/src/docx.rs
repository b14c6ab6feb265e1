//! Word (DOCX) export
//!
//! Writes a minimal WordprocessingML package: content types, package
//! relationships, styles and the document body.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::document::{ExportDocument, ExportTable};
use crate::error::RenderError;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults><w:rPrDefault><w:rPr><w:sz w:val="20"/></w:rPr></w:rPrDefault></w:docDefaults>
  <w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:rPr><w:b/><w:sz w:val="36"/></w:rPr></w:style>
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:pPr><w:spacing w:before="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="26"/></w:rPr></w:style>
  <w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders>
    <w:top w:val="single" w:sz="4"/><w:left w:val="single" w:sz="4"/><w:bottom w:val="single" w:sz="4"/>
    <w:right w:val="single" w:sz="4"/><w:insideH w:val="single" w:sz="4"/><w:insideV w:val="single" w:sz="4"/>
  </w:tblBorders></w:tblPr></w:style>
</w:styles>"#;

/// Render `doc` as DOCX bytes
pub fn render_docx(doc: &ExportDocument) -> Result<Vec<u8>, RenderError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/styles.xml", STYLES.to_string()),
        ("word/document.xml", document_xml(doc)),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

/// The `word/document.xml` body
pub fn document_xml(doc: &ExportDocument) -> String {
    let mut body = String::new();

    for line in doc.issuer_lines() {
        body.push_str(&paragraph(&line, None, false));
    }
    body.push_str(&paragraph(&doc.title, Some("Title"), false));
    body.push_str(&paragraph(
        &format!("Record {}  {}", doc.record_id, doc.timestamp.format("%d/%m/%Y")),
        None,
        false,
    ));
    if let Some(disclaimer) = &doc.disclaimer {
        body.push_str(&paragraph(disclaimer, None, true));
    }
    if !doc.warnings.is_empty() {
        body.push_str(&paragraph("Check before sending", None, true));
        for warning in &doc.warnings {
            body.push_str(&paragraph(&format!("- {}", warning), None, false));
        }
    }

    for section in &doc.sections {
        body.push_str(&paragraph(&section.title, Some("Heading1"), false));
        for field in &section.fields {
            body.push_str(&format!(
                "<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">{}: </w:t></w:r><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
                escape(&field.label),
                escape(&field.value)
            ));
        }
        if let Some(table) = section.table.as_ref().filter(|t| !t.rows.is_empty()) {
            body.push_str(&table_xml(table));
        }
    }
    body.push_str(&paragraph(&doc.footer(), None, false));

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1247" w:right="1134" w:bottom="1247" w:left="1134"/></w:sectPr></w:body></w:document>"#,
        body
    )
}

fn paragraph(text: &str, style: Option<&str>, bold: bool) -> String {
    let ppr = style
        .map(|s| format!("<w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>", s))
        .unwrap_or_default();
    let rpr = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
    format!(
        "<w:p>{}<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        ppr,
        rpr,
        escape(text)
    )
}

fn table_xml(table: &ExportTable) -> String {
    let cell = |text: &str, bold: bool| {
        let rpr = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
        format!(
            "<w:tc><w:p><w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r></w:p></w:tc>",
            rpr,
            escape(text)
        )
    };

    let header: String = table.columns.iter().map(|c| cell(c, true)).collect();
    let rows: String = table
        .rows
        .iter()
        .map(|row| format!("<w:tr>{}</w:tr>", row.iter().map(|c| cell(c, false)).collect::<String>()))
        .collect();

    format!(
        "<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/><w:tblW w:w=\"5000\" w:type=\"pct\"/></w:tblPr><w:tr>{}</w:tr>{}</w:tbl><w:p/>",
        header, rows
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::{issued_draft, sample_draft};
    use crate::document::Audience;
    use std::io::Read;

    #[test]
    fn test_docx_package_layout() {
        let doc = ExportDocument::prepare(&issued_draft(), None, Audience::Client).unwrap();
        let bytes = render_docx(&doc).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/_rels/document.xml.rels",
            "word/styles.xml",
            "word/document.xml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {}", name);
        }

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.contains("Brush &amp; Roll Pty Ltd"));
        assert!(xml.contains("&lt;feature wall&gt;"));
        assert!(xml.contains("$350.00"));
    }

    #[test]
    fn test_disclaimer_only_on_drafts() {
        let draft = ExportDocument::prepare(&sample_draft(), None, Audience::Internal).unwrap();
        assert!(document_xml(&draft).contains("DRAFT - review required"));

        let issued = ExportDocument::prepare(&issued_draft(), None, Audience::Client).unwrap();
        assert!(!document_xml(&issued).contains("DRAFT - review required"));
        assert!(!document_xml(&issued).contains("Check before sending"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }
}

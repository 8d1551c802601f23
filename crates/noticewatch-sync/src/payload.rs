//! Decoding of jqGrid responses into raw rows.
//!
//! The endpoint usually answers JSON (`{"rows": [...]}`) but falls back to
//! the jqGrid XML form (`<rows><row><cell>..</cell></row></rows>`) for some
//! sessions. Both end up as [`RawRow`]s.

use noticewatch_core::RawRow;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("JSON response has no `rows` array")]
    MissingRows,
    #[error("XML response has no <rows> element")]
    MissingRoot,
    #[error("XML parse error: {0}")]
    Xml(String),
}

/// Decode a response body, trying JSON first and jqGrid XML second.
pub fn parse_page(body: &str) -> Result<Vec<RawRow>, PayloadError> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => parse_json(value),
        Err(_) => parse_xml(body),
    }
}

fn parse_json(mut value: Value) -> Result<Vec<RawRow>, PayloadError> {
    let rows = match value.get_mut("rows").map(Value::take) {
        Some(rows @ Value::Array(_)) => rows,
        _ => return Err(PayloadError::MissingRows),
    };
    // `RawRow::Unrecognized` accepts any element, so an array always decodes.
    serde_json::from_value(rows).map_err(|_| PayloadError::MissingRows)
}

/// Decode jqGrid XML. Cell text (plain or CDATA) is unescaped and trimmed.
pub fn parse_xml(body: &str) -> Result<Vec<RawRow>, PayloadError> {
    let mut reader = Reader::from_str(body);
    let mut saw_root = false;
    let mut rows = Vec::new();
    let mut cells: Option<Vec<String>> = None;
    let mut text: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"rows" => saw_root = true,
                b"row" => cells = Some(Vec::new()),
                b"cell" if cells.is_some() => text = Some(String::new()),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"rows" => saw_root = true,
                b"row" => rows.push(RawRow::from_cells(Vec::<String>::new())),
                b"cell" => {
                    if let Some(cells) = cells.as_mut() {
                        cells.push(String::new());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(buf) = text.as_mut() {
                    let unescaped = e.unescape().map_err(|e| PayloadError::Xml(e.to_string()))?;
                    buf.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(buf) = text.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"cell" => {
                    if let (Some(cells), Some(buf)) = (cells.as_mut(), text.take()) {
                        cells.push(buf.trim().to_string());
                    }
                }
                b"row" => {
                    if let Some(cells) = cells.take() {
                        rows.push(RawRow::from_cells(cells));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(PayloadError::Xml(e.to_string())),
            _ => {}
        }
    }

    if !saw_root {
        return Err(PayloadError::MissingRoot);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use noticewatch_core::normalize;

    #[test]
    fn json_rows_are_decoded() {
        let body = r#"{"page":1,"total":1,"records":2,"rows":[
            {"id":"1","cell":["1","Internship","HIGH","Acme","Test"]},
            {"notice":{"id":2,"title":"PPT","company":"Beta"}}
        ]}"#;
        let notices = normalize(parse_page(body).unwrap());
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].company, "Acme");
        assert_eq!(notices[1].id, "2");
    }

    #[test]
    fn json_without_rows_is_malformed() {
        assert!(matches!(
            parse_page(r#"{"error":"session expired"}"#),
            Err(PayloadError::MissingRows)
        ));
        assert!(matches!(parse_page(r#"{"rows":null}"#), Err(PayloadError::MissingRows)));
    }

    #[test]
    fn xml_rows_are_decoded() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
            <rows>
              <page>1</page>
              <row id="1">
                <cell>  1401 </cell>
                <cell>Placement</cell>
                <cell>NORMAL</cell>
                <cell>Acme &amp; Sons</cell>
                <cell><![CDATA[<b>Shortlist</b> released]]></cell>
              </row>
              <row id="2"><cell>1402</cell><cell/><cell>HIGH</cell></row>
            </rows>"#;
        let notices = normalize(parse_page(body).unwrap());
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].id, "1401");
        assert_eq!(notices[0].company, "Acme & Sons");
        assert_eq!(notices[0].title, "<b>Shortlist</b> released");
        assert_eq!(notices[1].category, "");
        assert_eq!(notices[1].priority, "HIGH");
    }

    #[test]
    fn empty_xml_grid_is_not_an_error() {
        assert!(parse_page("<rows><page>1</page></rows>").unwrap().is_empty());
    }

    #[test]
    fn html_login_page_is_malformed() {
        let body = "<html><body><form action=\"login\">Sign in</form></body></html>";
        assert!(matches!(parse_page(body), Err(PayloadError::MissingRoot)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(parse_page(""), Err(PayloadError::MissingRoot)));
        assert!(matches!(parse_page("not a grid"), Err(PayloadError::MissingRoot)));
    }
}

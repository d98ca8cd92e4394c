//! Reader for the first worksheet of an Office Open XML workbook (`.xlsx`).
//!
//! An xlsx file is a zip container. The parts used here are:
//! - `xl/workbook.xml` for sheet order and the 1904 date-system flag
//! - `xl/_rels/workbook.xml.rels` to map the first sheet to its part name
//! - `xl/sharedStrings.xml` for the shared string table
//! - `xl/styles.xml` to learn which cell styles carry a date format
//! - the worksheet part itself for the cells

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::data::{CellValue, Table};
use crate::error::{ChartError, ChartResult};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";
const FALLBACK_SHEET_PART: &str = "xl/worksheets/sheet1.xml";
/// Sheet size limits of the xlsx format (column XFD, row 1048576).
const MAX_COLUMNS: u32 = 16_384;
const MAX_ROWS: u32 = 1_048_576;

/// Largest serial day Excel can represent (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

/// Parse the first worksheet of an xlsx workbook into a [`Table`].
///
/// The first row present in the sheet is the header row.
pub fn read_first_sheet(bytes: &[u8]) -> ChartResult<Table> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let workbook = read_part(&mut archive, WORKBOOK_PART)?
        .ok_or_else(|| ChartError::UnsupportedFormat("missing xl/workbook.xml".to_string()))?;
    let info = parse_workbook(&workbook)?;

    let sheet_part = match (&info.first_sheet_rel, read_part(&mut archive, WORKBOOK_RELS_PART)?) {
        (Some(rel_id), Some(rels)) => {
            resolve_relationship(&rels, rel_id)?.unwrap_or_else(|| FALLBACK_SHEET_PART.to_string())
        }
        _ => FALLBACK_SHEET_PART.to_string(),
    };
    debug!(part = %sheet_part, date1904 = info.date1904, "reading worksheet");

    let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let date_styles = match read_part(&mut archive, STYLES_PART)? {
        Some(xml) => parse_date_styles(&xml)?,
        None => HashSet::new(),
    };

    let sheet = read_part(&mut archive, &sheet_part)?.ok_or_else(|| {
        ChartError::UnsupportedFormat(format!("missing worksheet part '{}'", sheet_part))
    })?;

    let ctx = CellContext {
        shared_strings: &shared_strings,
        date_styles: &date_styles,
        date1904: info.date1904,
    };
    let cells = parse_worksheet(&sheet, &ctx)?;

    build_table(cells)
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> ChartResult<Option<String>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut content = String::new();
            file.read_to_string(&mut content).map_err(|e| {
                ChartError::UnsupportedFormat(format!("cannot read part '{}': {}", name, e))
            })?;
            Ok(Some(content))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Value of the attribute whose local name is `key`, ignoring namespace prefixes.
fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

#[derive(Debug, Default)]
struct WorkbookInfo {
    first_sheet_rel: Option<String>,
    date1904: bool,
}

fn parse_workbook(xml: &str) -> ChartResult<WorkbookInfo> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut info = WorkbookInfo::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"workbookPr" => {
                    info.date1904 = matches!(
                        attr_value(e, b"date1904").as_deref(),
                        Some("1") | Some("true")
                    );
                }
                b"sheet" if info.first_sheet_rel.is_none() => {
                    info.first_sheet_rel = attr_value(e, b"id");
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(info)
}

/// Map a relationship id to a zip part name.
fn resolve_relationship(xml: &str, rel_id: &str) -> ChartResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attr_value(e, b"Id").as_deref() == Some(rel_id) {
                    return Ok(attr_value(e, b"Target").map(|target| {
                        match target.strip_prefix('/') {
                            Some(absolute) => absolute.to_string(),
                            None => format!("xl/{}", target),
                        }
                    }));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(None)
}

/// Parse `xl/sharedStrings.xml`. Rich-text runs are concatenated; phonetic
/// guide runs (`rPh`) are skipped.
fn parse_shared_strings(xml: &str) -> ChartResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();

    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Event::Text(ref t) if in_text && !in_phonetic => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape()?);
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

/// Indices into `cellXfs` whose number format displays a date or time.
fn parse_date_styles(xml: &str) -> ChartResult<HashSet<usize>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut xf_formats: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"numFmt" => {
                    if let (Some(id), Some(code)) =
                        (attr_value(e, b"numFmtId"), attr_value(e, b"formatCode"))
                    {
                        if let Ok(id) = id.parse::<u32>() {
                            custom_formats.insert(id, code);
                        }
                    }
                }
                b"xf" if in_cell_xfs => {
                    let id = attr_value(e, b"numFmtId")
                        .and_then(|v| v.parse::<u32>().ok())
                        .unwrap_or(0);
                    xf_formats.push(id);
                }
                _ => {}
            },
            Event::End(ref e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_formats
        .into_iter()
        .enumerate()
        .filter(|(_, id)| is_date_format(*id, custom_formats.get(id).map(String::as_str)))
        .map(|(idx, _)| idx)
        .collect())
}

/// Whether a number format id (built-in or custom code) renders as a date/time.
pub fn is_date_format(id: u32, custom_code: Option<&str>) -> bool {
    if let Some(code) = custom_code {
        return is_date_format_code(code);
    }
    // Built-in date/time ids, including the East Asian locale variants.
    matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58)
}

fn is_date_format_code(code: &str) -> bool {
    let mut stripped = String::with_capacity(code.len());
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '[' => {
                // Elapsed-time sections like [h] still mean time.
                let section: String = chars.by_ref().take_while(|&b| b != ']').collect();
                let lower = section.to_ascii_lowercase();
                if matches!(lower.as_str(), "h" | "hh" | "m" | "mm" | "s" | "ss") {
                    stripped.push_str(&lower);
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            _ => stripped.push(c.to_ascii_lowercase()),
        }
    }

    if stripped.contains("general") {
        return false;
    }
    stripped.chars().any(|c| matches!(c, 'd' | 'm' | 'y' | 'h' | 's'))
}

struct CellContext<'a> {
    shared_strings: &'a [String],
    date_styles: &'a HashSet<usize>,
    date1904: bool,
}

/// Raw cell as read from `<c>` before type conversion.
#[derive(Debug, Default)]
struct RawCell {
    cell_type: Option<String>,
    style: Option<usize>,
    value: String,
    has_value: bool,
}

type CellGrid = BTreeMap<(u32, u32), CellValue>;

fn parse_worksheet(xml: &str, ctx: &CellContext) -> ChartResult<CellGrid> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut cells = CellGrid::new();

    let mut row_num: u32 = 0;
    let mut next_col: u32 = 1;
    let mut current: Option<(u32, u32, RawCell)> = None;
    let mut in_value = false;
    let mut in_inline_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    row_num = row_number(e, row_num)?;
                    next_col = 1;
                }
                b"c" => {
                    let (row, col) = cell_position(e, row_num, next_col)?;
                    next_col = next_column(col)?;
                    current = Some((row, col, raw_cell(e)));
                }
                b"v" => in_value = true,
                b"t" => in_inline_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    row_num = row_number(e, row_num)?;
                }
                b"c" => {
                    // Styled but valueless cell.
                    let (_, col) = cell_position(e, row_num, next_col)?;
                    next_col = next_column(col)?;
                }
                _ => {}
            },
            Event::Text(ref t) => {
                if let Some((_, _, raw)) = current.as_mut() {
                    if in_value || (in_inline_text && !in_phonetic) {
                        raw.value.push_str(&t.unescape()?);
                        raw.has_value = true;
                    }
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some((row, col, raw)) = current.take() {
                        let value = convert_cell(raw, ctx)?;
                        if !value.is_empty() {
                            cells.insert((row, col), value);
                        }
                    }
                }
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

fn raw_cell(e: &BytesStart) -> RawCell {
    RawCell {
        cell_type: attr_value(e, b"t"),
        style: attr_value(e, b"s").and_then(|s| s.parse().ok()),
        ..RawCell::default()
    }
}

fn cell_position(e: &BytesStart, row_num: u32, next_col: u32) -> ChartResult<(u32, u32)> {
    match attr_value(e, b"r") {
        Some(reference) => reference_to_coords(&reference),
        None if next_col > MAX_COLUMNS => Err(out_of_bounds("column", &next_col.to_string())),
        None => Ok((row_num.max(1), next_col)),
    }
}

fn out_of_bounds(what: &str, value: &str) -> ChartError {
    ChartError::UnsupportedFormat(format!("{} '{}' is outside the sheet bounds", what, value))
}

/// Row number from a `<row r="..">` element, or the one after `previous`.
fn row_number(e: &BytesStart, previous: u32) -> ChartResult<u32> {
    let row = match attr_value(e, b"r") {
        Some(r) => r
            .trim()
            .parse::<u32>()
            .map_err(|_| out_of_bounds("row", &r))?,
        None => previous
            .checked_add(1)
            .ok_or_else(|| out_of_bounds("row", &previous.to_string()))?,
    };
    if row == 0 || row > MAX_ROWS {
        return Err(out_of_bounds("row", &row.to_string()));
    }
    Ok(row)
}

/// Column that follows `col` for cells without a reference.
fn next_column(col: u32) -> ChartResult<u32> {
    col.checked_add(1)
        .filter(|&next| next <= MAX_COLUMNS + 1)
        .ok_or_else(|| out_of_bounds("column", &col.to_string()))
}

/// Convert a cell reference like `B12` into 1-based `(row, col)`.
pub fn reference_to_coords(reference: &str) -> ChartResult<(u32, u32)> {
    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .filter(|&idx| idx > 0)
        .ok_or_else(|| {
            ChartError::UnsupportedFormat(format!("invalid cell reference '{}'", reference))
        })?;
    let (letters, digits) = reference.split_at(split);

    let mut col = 0u32;
    for byte in letters.bytes() {
        if !byte.is_ascii_alphabetic() {
            return Err(ChartError::UnsupportedFormat(format!(
                "invalid cell reference '{}'",
                reference
            )));
        }
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add((byte.to_ascii_uppercase() - b'A' + 1) as u32))
            .filter(|&c| c <= MAX_COLUMNS)
            .ok_or_else(|| out_of_bounds("cell reference", reference))?;
    }

    let row = digits.parse::<u32>().map_err(|_| {
        ChartError::UnsupportedFormat(format!("invalid cell reference '{}'", reference))
    })?;
    if row == 0 || row > MAX_ROWS {
        return Err(out_of_bounds("cell reference", reference));
    }

    Ok((row, col))
}

fn convert_cell(raw: RawCell, ctx: &CellContext) -> ChartResult<CellValue> {
    if !raw.has_value {
        return Ok(CellValue::Empty);
    }

    let value = match raw.cell_type.as_deref() {
        Some("s") => {
            let idx: usize = raw.value.trim().parse().map_err(|_| {
                ChartError::UnsupportedFormat(format!("invalid shared string index '{}'", raw.value))
            })?;
            let s = ctx.shared_strings.get(idx).ok_or_else(|| {
                ChartError::UnsupportedFormat(format!("shared string index {} out of range", idx))
            })?;
            CellValue::Text(s.clone())
        }
        Some("str") | Some("inlineStr") | Some("e") => CellValue::Text(raw.value),
        Some("b") => match raw.value.trim() {
            "1" | "true" => CellValue::Bool(true),
            "0" | "false" => CellValue::Bool(false),
            other => CellValue::Text(other.to_string()),
        },
        Some("d") => match parse_iso_datetime(raw.value.trim()) {
            Some(dt) => CellValue::Date(dt),
            None => CellValue::Text(raw.value),
        },
        _ => match raw.value.trim().parse::<f64>() {
            Ok(n) => {
                let is_date = raw.style.is_some_and(|s| ctx.date_styles.contains(&s));
                match is_date.then(|| serial_to_datetime(n, ctx.date1904)).flatten() {
                    Some(dt) => CellValue::Date(dt),
                    None => CellValue::Number(n),
                }
            }
            Err(_) => CellValue::Text(raw.value),
        },
    };

    Ok(value)
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Convert an Excel serial date to a timestamp.
///
/// The 1900 system counts the fictitious 1900-02-29, so serials from 61 on
/// are measured from 1899-12-30 and earlier ones from 1899-12-31.
pub fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL_DAY {
        return None;
    }

    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial < 61.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let millis = (serial * 86_400_000.0).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(chrono::Duration::milliseconds(millis))
}

fn build_table(cells: CellGrid) -> ChartResult<Table> {
    let Some(&(header_row, _)) = cells.keys().next() else {
        return Err(ChartError::UnsupportedFormat(
            "first worksheet is empty".to_string(),
        ));
    };

    let min_col = cells.keys().map(|&(_, c)| c).min().unwrap_or(1);
    let max_col = cells.keys().map(|&(_, c)| c).max().unwrap_or(min_col);
    let max_row = cells.keys().map(|&(r, _)| r).max().unwrap_or(header_row);

    let headers: Vec<String> = (min_col..=max_col)
        .map(|col| {
            cells
                .get(&(header_row, col))
                .map(|v| v.to_string())
                .unwrap_or_default()
        })
        .collect();

    let rows: Vec<Vec<CellValue>> = ((header_row + 1)..=max_row)
        .map(|row| {
            (min_col..=max_col)
                .map(|col| cells.get(&(row, col)).cloned().unwrap_or(CellValue::Empty))
                .collect()
        })
        .collect();

    debug!(columns = headers.len(), rows = rows.len(), "worksheet parsed");
    Ok(Table::from_rows(headers, rows))
}

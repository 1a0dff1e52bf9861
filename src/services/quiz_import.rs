//! Quiz workbook import — parse uploaded `.xlsx` files into questions.
//!
//! DESIGN
//! ======
//! An `.xlsx` workbook is a zip archive of XML parts. Imports only need
//! cell text from the first worksheet, so this module reads the shared
//! string table and worksheet part with a small scanner instead of a full
//! XML stack. Row errors are collected per row (`row N: reason`) so an
//! admin can fix the workbook in one pass; a single bad row fails the
//! import but keeps parsing the rest.
//!
//! Row format (template downloadable from the admin API):
//! A: type (`single`/`multiple`), B: question text, C–F: options (at
//! least two), then the answer column (auto-detected after the options),
//! then an optional explanation. Every imported question scores 5.

use std::io::{Cursor, Read, Write};

use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::services::survey::QuestionInput;

pub const IMPORT_QUESTION_SCORE: i32 = 5;
const MAX_OPTION_COLUMNS: usize = 4;
const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("workbook is not a valid xlsx archive: {0}")]
    Archive(String),
    #[error("workbook has no worksheet")]
    NoWorksheet,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub single_choice: usize,
    pub multiple_choice: usize,
    pub total_score: i32,
}

#[derive(Debug, serde::Serialize)]
pub struct ImportReport {
    pub questions: Vec<QuestionInput>,
    pub errors: Vec<String>,
    pub summary: ImportSummary,
}

impl ImportReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// WORKBOOK READING
// =============================================================================

/// Parse an uploaded workbook into questions and per-row errors.
///
/// # Errors
///
/// Returns an error when the bytes are not a readable xlsx archive; row
/// level problems are reported through [`ImportReport::errors`] instead.
pub fn parse_workbook(bytes: &[u8]) -> Result<ImportReport, ImportError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| ImportError::Archive(e.to_string()))?;

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml") {
        Some(xml) => parse_shared_strings(&xml),
        None => Vec::new(),
    };

    let sheet_name = first_worksheet_name(&archive).ok_or(ImportError::NoWorksheet)?;
    let sheet_xml = read_part(&mut archive, &sheet_name).ok_or(ImportError::NoWorksheet)?;
    let rows = parse_sheet_rows(&sheet_xml, &shared);

    let mut questions = Vec::new();
    let mut errors = Vec::new();

    // Row 1 is the header.
    for (idx, row) in rows.iter().enumerate().skip(1) {
        let row_number = idx + 1;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        // Stop at footer notes: a first column that is not a question type
        // while the question column is empty.
        if row.first().is_some_and(|c| !c.trim().is_empty()) && row.get(1).is_none_or(|c| c.trim().is_empty()) {
            if map_question_type(row[0].trim()).is_none() {
                continue;
            }
        }
        match parse_row(row, row_number) {
            Ok(question) => questions.push(question),
            Err(reason) => errors.push(format!("row {row_number}: {reason}")),
        }
    }

    let summary = summarize(&questions);
    Ok(ImportReport { questions, errors, summary })
}

fn summarize(questions: &[QuestionInput]) -> ImportSummary {
    ImportSummary {
        total: questions.len(),
        single_choice: questions
            .iter()
            .filter(|q| q.question_type == "single_choice")
            .count(),
        multiple_choice: questions
            .iter()
            .filter(|q| q.question_type == "multiple_choice")
            .count(),
        total_score: i32::try_from(questions.len()).unwrap_or(0) * IMPORT_QUESTION_SCORE,
    }
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<String> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    Some(content)
}

fn first_worksheet_name(archive: &ZipArchive<Cursor<&[u8]>>) -> Option<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with("xl/worksheets/") && name.ends_with(".xml"))
        .map(String::from)
        .collect();
    names.sort();
    names.into_iter().next()
}

// =============================================================================
// ROW PARSING
// =============================================================================

fn map_question_type(raw: &str) -> Option<&'static str> {
    match raw.to_lowercase().as_str() {
        "single" | "single_choice" | "单选" | "单选题" => Some("single_choice"),
        "multiple" | "multiple_choice" | "多选" | "多选题" => Some("multiple_choice"),
        _ => None,
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map_or("", |s| s.trim())
}

fn parse_row(row: &[String], _row_number: usize) -> Result<QuestionInput, String> {
    let raw_type = cell(row, 0);
    let question_type =
        map_question_type(raw_type).ok_or_else(|| format!("invalid question type '{raw_type}' (expected single or multiple)"))?;

    let question_text = cell(row, 1);
    if question_text.is_empty() {
        return Err("question text must not be empty".into());
    }

    let mut options = Vec::new();
    for i in 0..MAX_OPTION_COLUMNS {
        let value = cell(row, 2 + i);
        if !value.is_empty() {
            options.push(value.to_string());
        }
    }
    if options.len() < 2 {
        return Err("at least 2 options are required".into());
    }

    let (answer_col, raw_answer) = detect_answer_column(row, options.len())
        .ok_or_else(|| "correct answer must not be empty".to_string())?;

    let letters = clean_answer_letters(&raw_answer);
    if letters.is_empty() {
        return Err("correct answer must not be empty".into());
    }
    for letter in letters.chars() {
        if !OPTION_LETTERS[..options.len()].contains(&letter) {
            return Err(format!("answer '{letter}' is outside the option range"));
        }
    }

    let correct_answer = if question_type == "multiple_choice" {
        letters
            .chars()
            .map(String::from)
            .collect::<Vec<_>>()
            .join(",")
    } else {
        letters.chars().take(1).collect()
    };

    let explanation = cell(row, answer_col + 1).to_string();

    Ok(QuestionInput {
        question_type: question_type.to_string(),
        question_text: question_text.to_string(),
        options,
        correct_answer,
        score: IMPORT_QUESTION_SCORE,
        explanation,
    })
}

/// Letters only, tolerating spaces and half/full-width commas.
fn clean_answer_letters(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase())
        .collect()
}

/// Find the answer column: the first cell after the options whose cleaned
/// letters all fall inside the option range. Falls back to column G.
fn detect_answer_column(row: &[String], option_count: usize) -> Option<(usize, String)> {
    let start = 2 + option_count;
    let end = (2 + MAX_OPTION_COLUMNS + 4).min(row.len());

    for idx in start..end {
        let value = cell(row, idx);
        if value.is_empty() {
            continue;
        }
        let letters = clean_answer_letters(value);
        if !letters.is_empty() && letters.chars().all(|c| OPTION_LETTERS[..option_count].contains(&c)) {
            return Some((idx, value.to_string()));
        }
    }

    // Fixed-layout fallback: answer in column G.
    let fallback = cell(row, 6);
    if !fallback.is_empty() {
        return Some((6, fallback.to_string()));
    }
    None
}

// =============================================================================
// MINIMAL SHEET XML READER
// =============================================================================

fn parse_shared_strings(xml: &str) -> Vec<String> {
    blocks(xml, "si")
        .into_iter()
        .map(|si| {
            blocks(&si, "t")
                .into_iter()
                .map(|t| unescape_xml(&t))
                .collect::<Vec<_>>()
                .concat()
        })
        .collect()
}

fn parse_sheet_rows(xml: &str, shared: &[String]) -> Vec<Vec<String>> {
    blocks(xml, "row")
        .into_iter()
        .map(|row_xml| parse_row_cells(&row_xml, shared))
        .collect()
}

fn parse_row_cells(row_xml: &str, shared: &[String]) -> Vec<String> {
    let mut cells: Vec<String> = Vec::new();
    let mut next_index = 0usize;

    for (tag, body) in tagged_blocks(row_xml, "c") {
        let index = attr(&tag, "r")
            .and_then(|reference| column_index(&reference))
            .unwrap_or(next_index);

        let cell_type = attr(&tag, "t").unwrap_or_default();
        let value = match cell_type.as_str() {
            "s" => blocks(&body, "v")
                .first()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .and_then(|i| shared.get(i).cloned())
                .unwrap_or_default(),
            "inlineStr" => blocks(&body, "t")
                .into_iter()
                .map(|t| unescape_xml(&t))
                .collect::<Vec<_>>()
                .concat(),
            _ => blocks(&body, "v")
                .first()
                .map(|v| unescape_xml(v))
                .unwrap_or_default(),
        };

        if cells.len() <= index {
            cells.resize(index + 1, String::new());
        }
        cells[index] = value;
        next_index = index + 1;
    }

    cells
}

/// Column index from a cell reference, e.g. `B2` -> 1.
fn column_index(reference: &str) -> Option<usize> {
    let letters: String = reference.chars().take_while(char::is_ascii_alphabetic).collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

/// Inner bodies of every `<tag ...>...</tag>` occurrence. Self-closing
/// tags yield nothing.
fn blocks(xml: &str, tag: &str) -> Vec<String> {
    tagged_blocks(xml, tag).into_iter().map(|(_, body)| body).collect()
}

/// `(open_tag, body)` for every `<tag ...>...</tag>` occurrence.
fn tagged_blocks(xml: &str, tag: &str) -> Vec<(String, String)> {
    let open_prefix = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut result = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find(&open_prefix) {
        let after_prefix = &rest[start + open_prefix.len()..];
        // Reject longer tag names sharing the prefix (e.g. `<row>` vs `<r>`).
        match after_prefix.chars().next() {
            Some(c) if c == '>' || c == ' ' || c == '/' || c == '\t' || c == '\r' || c == '\n' => {}
            _ => {
                rest = &rest[start + open_prefix.len()..];
                continue;
            }
        }

        let Some(tag_end_rel) = after_prefix.find('>') else {
            break;
        };
        let open_tag = &after_prefix[..tag_end_rel];
        let after_open = &after_prefix[tag_end_rel + 1..];

        if open_tag.trim_end().ends_with('/') {
            // Self-closing: empty body.
            result.push((open_tag.to_string(), String::new()));
            rest = after_open;
            continue;
        }

        let Some(close_rel) = after_open.find(&close) else {
            break;
        };
        result.push((open_tag.to_string(), after_open[..close_rel].to_string()));
        rest = &after_open[close_rel + close.len()..];
    }

    result
}

/// Attribute value from an open-tag string, e.g. `r="B2" t="s"`.
fn attr(open_tag: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    let start = open_tag.find(&needle)? + needle.len();
    let end = open_tag[start..].find('"')? + start;
    Some(open_tag[start..end].to_string())
}

fn unescape_xml(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// =============================================================================
// TEMPLATE GENERATION
// =============================================================================

const TEMPLATE_HEADERS: [&str; 8] = [
    "type",
    "question",
    "option A",
    "option B",
    "option C",
    "option D",
    "answer",
    "explanation",
];

const TEMPLATE_EXAMPLES: [[&str; 8]; 3] = [
    [
        "single",
        "Which keyword declares an immutable binding?",
        "let",
        "var",
        "const fn",
        "static mut",
        "A",
        "let bindings are immutable unless marked mut",
    ],
    [
        "multiple",
        "Which of these are integer types?",
        "i32",
        "u64",
        "f32",
        "usize",
        "A,B,D",
        "f32 is a floating point type",
    ],
    ["single", "1+1=?", "1", "2", "3", "4", "B", "basic arithmetic"],
];

fn sheet_xml_row(row_number: usize, cells: &[&str]) -> String {
    let mut xml = format!("<row r=\"{row_number}\">");
    for (idx, value) in cells.iter().enumerate() {
        let column = char::from(b'A' + u8::try_from(idx).unwrap_or(0));
        xml.push_str(&format!(
            "<c r=\"{column}{row_number}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
            escape_xml(value)
        ));
    }
    xml.push_str("</row>");
    xml
}

/// Build the downloadable import template workbook.
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
pub fn generate_template() -> Result<Vec<u8>, ImportError> {
    let mut rows = String::new();
    rows.push_str(&sheet_xml_row(1, &TEMPLATE_HEADERS));
    for (idx, example) in TEMPLATE_EXAMPLES.iter().enumerate() {
        rows.push_str(&sheet_xml_row(idx + 2, example));
    }

    let sheet = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
         <sheetData>{rows}</sheetData></worksheet>"
    );

    let workbook = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
         <sheets><sheet name=\"Questions\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>";

    let workbook_rels = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" \
         Target=\"worksheets/sheet1.xml\"/></Relationships>";

    let root_rels = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" \
         Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" \
         Target=\"xl/workbook.xml\"/></Relationships>";

    let content_types = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" \
         ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
         <Override PartName=\"/xl/worksheets/sheet1.xml\" \
         ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/></Types>";

    let cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(cursor);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts: [(&str, &str); 5] = [
        ("[Content_Types].xml", content_types),
        ("_rels/.rels", root_rels),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", workbook_rels),
        ("xl/worksheets/sheet1.xml", &sheet),
    ];
    for (name, content) in parts {
        writer
            .start_file(name, options)
            .map_err(|e| ImportError::Archive(e.to_string()))?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| ImportError::Archive(e.to_string()))?;
    }

    let cursor = writer.finish().map_err(|e| ImportError::Archive(e.to_string()))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
#[path = "quiz_import_test.rs"]
mod tests;

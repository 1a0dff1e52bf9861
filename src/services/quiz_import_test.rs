use super::*;

// =============================================================================
// XML SCANNER
// =============================================================================

#[test]
fn blocks_extracts_bodies() {
    let xml = "<si><t>alpha</t></si><si><t>beta</t><t> gamma</t></si>";
    assert_eq!(blocks(xml, "t"), vec!["alpha", "beta", " gamma"]);
}

#[test]
fn blocks_does_not_match_longer_tag_names() {
    let xml = "<row><r>inner</r></row>";
    assert_eq!(blocks(xml, "r"), vec!["inner"]);
}

#[test]
fn tagged_blocks_handles_self_closing() {
    let xml = r#"<c r="A1"/><c r="B1" t="s"><v>0</v></c>"#;
    let cells = tagged_blocks(xml, "c");
    assert_eq!(cells.len(), 2);
    assert!(cells[0].1.is_empty());
    assert_eq!(cells[1].1, "<v>0</v>");
}

#[test]
fn attr_reads_quoted_values() {
    assert_eq!(attr(r#" r="B2" t="s""#, "r").as_deref(), Some("B2"));
    assert_eq!(attr(r#" r="B2" t="s""#, "t").as_deref(), Some("s"));
    assert!(attr(r#" r="B2""#, "t").is_none());
}

#[test]
fn unescape_round_trips_escape() {
    let raw = r#"a < b & c > "d" 'e'"#;
    assert_eq!(unescape_xml(&escape_xml(raw)), raw);
}

#[test]
fn column_index_decodes_references() {
    assert_eq!(column_index("A1"), Some(0));
    assert_eq!(column_index("B2"), Some(1));
    assert_eq!(column_index("H10"), Some(7));
    assert_eq!(column_index("AA3"), Some(26));
    assert_eq!(column_index("5"), None);
}

// =============================================================================
// SHEET PARSING
// =============================================================================

#[test]
fn shared_string_cells_resolve() {
    let shared = parse_shared_strings("<sst><si><t>hello</t></si><si><t>wor</t><t>ld</t></si></sst>");
    assert_eq!(shared, vec!["hello", "world"]);

    let sheet = r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>"#;
    let rows = parse_sheet_rows(sheet, &shared);
    assert_eq!(rows, vec![vec!["hello".to_string(), "world".to_string()]]);
}

#[test]
fn sparse_rows_keep_column_positions() {
    let sheet = r#"<row r="1"><c r="C1"><v>42</v></c></row>"#;
    let rows = parse_sheet_rows(sheet, &[]);
    assert_eq!(rows[0], vec!["", "", "42"]);
}

#[test]
fn inline_strings_resolve() {
    let sheet = r#"<row r="1"><c r="A1" t="inlineStr"><is><t>direct</t></is></c></row>"#;
    let rows = parse_sheet_rows(sheet, &[]);
    assert_eq!(rows[0], vec!["direct"]);
}

// =============================================================================
// ROW -> QUESTION
// =============================================================================

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn parses_single_choice_row() {
    let cells = row(&["single", "Pick one", "a", "b", "c", "d", "B", "because"]);
    let q = parse_row(&cells, 2).unwrap();
    assert_eq!(q.question_type, "single_choice");
    assert_eq!(q.options.len(), 4);
    assert_eq!(q.correct_answer, "B");
    assert_eq!(q.explanation, "because");
    assert_eq!(q.score, IMPORT_QUESTION_SCORE);
}

#[test]
fn parses_multiple_choice_with_comma_and_contiguous_answers() {
    let cells = row(&["multiple", "Pick some", "a", "b", "c", "d", "A,B,D", ""]);
    let q = parse_row(&cells, 2).unwrap();
    assert_eq!(q.correct_answer, "A,B,D");

    let cells = row(&["multiple", "Pick some", "a", "b", "c", "d", "ABD", ""]);
    let q = parse_row(&cells, 2).unwrap();
    assert_eq!(q.correct_answer, "A,B,D");
}

#[test]
fn detects_answer_in_fixed_column_with_two_options() {
    // Two options, unused option columns left blank, answer in column G.
    let cells = row(&["single", "Pick", "yes", "no", "", "", "A"]);
    let q = parse_row(&cells, 2).unwrap();
    assert_eq!(q.options, vec!["yes", "no"]);
    assert_eq!(q.correct_answer, "A");
}

#[test]
fn detects_answer_shifted_past_the_fixed_column() {
    // Answer landed one column right of the usual spot.
    let cells = row(&["single", "Pick", "yes", "no", "", "", "", "A", "note"]);
    let q = parse_row(&cells, 2).unwrap();
    assert_eq!(q.correct_answer, "A");
    assert_eq!(q.explanation, "note");
}

#[test]
fn rejects_unknown_type() {
    let cells = row(&["essay", "Write", "a", "b", "", "", "A", ""]);
    let err = parse_row(&cells, 2).unwrap_err();
    assert!(err.contains("invalid question type"));
}

#[test]
fn rejects_answer_outside_options() {
    let cells = row(&["single", "Pick", "a", "b", "", "", "C", ""]);
    let err = parse_row(&cells, 2).unwrap_err();
    assert!(err.contains("outside the option range"));
}

#[test]
fn rejects_missing_options() {
    let cells = row(&["single", "Pick", "only", "", "", "", "A", ""]);
    let err = parse_row(&cells, 2).unwrap_err();
    assert!(err.contains("at least 2 options"));
}

// =============================================================================
// WORKBOOK LEVEL
// =============================================================================

#[test]
fn template_round_trips_through_parser() {
    let bytes = generate_template().unwrap();
    let report = parse_workbook(&bytes).unwrap();
    assert!(report.is_clean(), "unexpected errors: {:?}", report.errors);
    assert_eq!(report.questions.len(), 3);
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.single_choice, 2);
    assert_eq!(report.summary.multiple_choice, 1);
    assert_eq!(report.summary.total_score, 15);
    assert_eq!(report.questions[1].correct_answer, "A,B,D");
}

#[test]
fn template_magic_bytes_are_zip() {
    let bytes = generate_template().unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

fn workbook_with_rows(rows: &[Vec<&str>]) -> Vec<u8> {
    let mut sheet_rows = String::new();
    sheet_rows.push_str(&sheet_xml_row(1, &TEMPLATE_HEADERS));
    for (idx, cells) in rows.iter().enumerate() {
        sheet_rows.push_str(&sheet_xml_row(idx + 2, cells));
    }
    let sheet = format!(
        "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
         <sheetData>{sheet_rows}</sheetData></worksheet>"
    );

    let cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(cursor);
    let options = FileOptions::default();
    writer.start_file("xl/worksheets/sheet1.xml", options).unwrap();
    writer.write_all(sheet.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[test]
fn bad_rows_are_reported_with_row_numbers() {
    let bytes = workbook_with_rows(&[
        vec!["single", "Good", "a", "b", "c", "d", "A", ""],
        vec!["essay", "Bad type", "a", "b", "", "", "A", ""],
        vec!["single", "Bad answer", "a", "b", "", "", "E", ""],
    ]);
    let report = parse_workbook(&bytes).unwrap();
    assert_eq!(report.questions.len(), 1);
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[0].starts_with("row 3:"));
    assert!(report.errors[1].starts_with("row 4:"));
    assert!(!report.is_clean());
}

#[test]
fn empty_rows_are_skipped() {
    let bytes = workbook_with_rows(&[
        vec!["", "", "", ""],
        vec!["single", "Good", "a", "b", "c", "d", "A", ""],
    ]);
    let report = parse_workbook(&bytes).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.questions.len(), 1);
}

#[test]
fn garbage_bytes_fail_as_archive_error() {
    let err = parse_workbook(b"definitely not a zip").unwrap_err();
    assert!(matches!(err, ImportError::Archive(_)));
}

#[test]
fn archive_without_worksheet_fails() {
    let cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(cursor);
    writer.start_file("unrelated.txt", FileOptions::default()).unwrap();
    writer.write_all(b"hi").unwrap();
    let bytes = writer.finish().unwrap().into_inner();
    let err = parse_workbook(&bytes).unwrap_err();
    assert!(matches!(err, ImportError::NoWorksheet));
}

use std::fs;
use std::path::PathBuf;

use ats_trends::error::ScrapeError;
use ats_trends::extract::{assign_labels, extract_rows_from_html, zip_truncated};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_thead_fixture_in_document_order() {
    let rows = extract_rows_from_html(&read_fixture("ats_trends_nba.html")).expect("fixture parses");
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0].labels().collect::<Vec<_>>(),
        vec!["Team", "ATS Record", "Cover %", "MOV", "ATS +/-"]
    );
    assert_eq!(rows[0].get("Team"), Some("Boston"));
    assert_eq!(rows[1].get("Team"), Some("LA Lakers"));
    assert_eq!(rows[1].get("ATS +/-"), Some("+1.4"));
    assert_eq!(rows[2].get("MOV"), Some("-9.8"));
}

#[test]
fn skips_rows_without_data_cells() {
    let rows = extract_rows_from_html(&read_fixture("ats_trends_ncb.html")).expect("fixture parses");
    let teams = rows.iter().filter_map(|r| r.get("Team")).collect::<Vec<_>>();
    assert_eq!(teams, vec!["Duke", "Gonzaga"]);
    assert_eq!(rows[1].get("ATS +/-"), Some(""));
}

#[test]
fn missing_table_is_an_error() {
    let err = extract_rows_from_html("<html><body><p>maintenance</p></body></html>")
        .expect_err("no table");
    assert!(matches!(err, ScrapeError::NoTableFound));
}

#[test]
fn header_only_table_is_empty() {
    let rows = extract_rows_from_html(
        "<table><thead><tr><th>Team</th><th>ATS Record</th></tr></thead><tbody></tbody></table>",
    )
    .expect("header-only table parses");
    assert!(rows.is_empty());
}

#[test]
fn table_without_rows_is_empty() {
    let rows = extract_rows_from_html("<table></table>").expect("empty table parses");
    assert!(rows.is_empty());
}

#[test]
fn blank_document_is_empty() {
    assert!(extract_rows_from_html("").expect("blank parses").is_empty());
    assert!(extract_rows_from_html("  \n ").expect("blank parses").is_empty());
}

#[test]
fn first_row_td_cells_act_as_headers() {
    let rows = extract_rows_from_html(
        "<table><tr><td>Team</td><td>Cover %</td></tr><tr><td>Utah</td><td>40.0%</td></tr></table>",
    )
    .expect("parses");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("Team"), Some("Utah"));
    assert_eq!(rows[0].get("Cover %"), Some("40.0%"));
}

#[test]
fn mismatched_rows_zip_to_shorter_length() {
    let html = r#"
        <table>
          <tr><th>Team</th><th>ATS Record</th><th>Cover %</th></tr>
          <tr><td>Miami</td><td>9-7-0</td></tr>
          <tr><td>Denver</td><td>11-5-0</td><td>68.8%</td><td>extra</td></tr>
        </table>
    "#;
    let rows = extract_rows_from_html(html).expect("parses");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].len(), 2);
    assert_eq!(rows[0].get("Cover %"), None);
    assert_eq!(rows[1].len(), 3);
    assert_eq!(rows[1].get("Cover %"), Some("68.8%"));
}

#[test]
fn empty_and_repeated_headers_get_unique_labels() {
    let html = r#"
        <table>
          <tr><th></th><th>Team</th><th> </th><th>Team</th></tr>
          <tr><td>1</td><td>Orlando</td><td>x</td><td>ORL</td></tr>
        </table>
    "#;
    let rows = extract_rows_from_html(html).expect("parses");
    assert_eq!(
        rows[0].labels().collect::<Vec<_>>(),
        vec!["column_1", "Team", "column_3", "Team_2"]
    );
    assert_eq!(rows[0].get("Team_2"), Some("ORL"));
}

#[test]
fn cell_text_is_collapsed_and_trimmed() {
    let html = "<table><tr><th> ATS\n  Record </th></tr><tr><td>\n 3 - 1 \t</td></tr></table>";
    let rows = extract_rows_from_html(html).expect("parses");
    assert_eq!(rows[0].get("ATS Record"), Some("3 - 1"));
}

#[test]
fn only_the_first_table_is_read() {
    let html = r#"
        <table><tr><th>Team</th></tr><tr><td>Phoenix</td></tr></table>
        <table><tr><th>Team</th></tr><tr><td>Dallas</td></tr></table>
    "#;
    let rows = extract_rows_from_html(html).expect("parses");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("Team"), Some("Phoenix"));
}

#[test]
fn data_rows_without_headers_are_rejected() {
    let html = "<table><tr></tr><tr><td>Phoenix</td></tr></table>";
    let err = extract_rows_from_html(html).expect_err("no header labels");
    assert!(matches!(err, ScrapeError::UnresolvableHeaders));
}

#[test]
fn label_assignment_and_zip_helpers() {
    let labels = assign_labels(vec!["".into(), "A".into(), "A".into(), "A".into()]);
    assert_eq!(labels, vec!["column_1", "A", "A_2", "A_3"]);

    let row = zip_truncated(&labels, vec!["1".into(), "2".into()]);
    assert_eq!(row.len(), 2);
    assert_eq!(row.get("A"), Some("2"));
}

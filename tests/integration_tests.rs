use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};

use zip::write::SimpleFileOptions;

/// Helper function to run the sheetplot binary with arguments and optional stdin
fn run_sheetplot(args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_sheetplot"))
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn sheetplot");

    if let Some(mut handle) = child.stdin.take() {
        if let Some(input) = stdin {
            handle
                .write_all(input.as_bytes())
                .expect("Failed to write to stdin");
        }
    }

    child.wait_with_output().expect("Failed to wait for sheetplot")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
    use image::GenericImageView;
    image::load_from_memory(bytes)
        .expect("Failed to decode PNG")
        .dimensions()
}

/// Minimal workbook: shared-string header row, a date-styled X column and two
/// numeric Y columns.
fn write_weather_xlsx(path: &Path) {
    let parts = [
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Weather" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#,
        ),
        (
            "xl/sharedStrings.xml",
            r#"<sst><si><t>Date</t></si><si><t>Temp (C)</t></si><si><t>Humidity (%)</t></si></sst>"#,
        ),
        (
            "xl/styles.xml",
            r#"<styleSheet><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs></styleSheet>"#,
        ),
        (
            "xl/worksheets/sheet1.xml",
            r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
<row r="2"><c r="A2" s="1"><v>45292</v></c><c r="B2"><v>3.5</v></c><c r="C2"><v>80</v></c></row>
<row r="3"><c r="A3" s="1"><v>45293</v></c><c r="B3"><v>4</v></c><c r="C3"><v>75</v></c></row>
<row r="4"><c r="A4" s="1"><v>45294</v></c><c r="B4"><v>2.5</v></c><c r="C4"><v>90</v></c></row>
</sheetData></worksheet>"#,
        ),
    ];

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer
            .start_file(name, SimpleFileOptions::default())
            .expect("Failed to start zip entry");
        writer
            .write_all(content.as_bytes())
            .expect("Failed to write zip entry");
    }
    let bytes = writer.finish().expect("Failed to finish zip").into_inner();
    fs::write(path, bytes).expect("Failed to write xlsx fixture");
}

#[test]
fn test_end_to_end_xlsx_dual_axis() {
    let dir = tempfile::tempdir().unwrap();
    let xlsx = dir.path().join("weather.xlsx");
    write_weather_xlsx(&xlsx);
    let json = dir.path().join("figure.json");

    let output = run_sheetplot(
        &[
            xlsx.to_str().unwrap(),
            "--x", "Date",
            "--y", "Temp (C)",
            "--y", "Humidity (%)",
            "--kind", "scatter",
            "--dual-axis",
            "--title", "Weather",
            "--out", dir.path().to_str().unwrap(),
            "--figure-json", json.to_str().unwrap(),
        ],
        None,
    );
    assert!(output.status.success(), "Failed: {}", String::from_utf8_lossy(&output.stderr));

    let png = fs::read(dir.path().join("Weather.png")).unwrap();
    assert!(is_valid_png(&png));
    assert_eq!(png_dimensions(&png), (1000, 600));

    let figure: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(figure["layout"]["y_axis2"]["title"], "Humidity (%)");
    assert_eq!(figure["layout"]["x_axis"]["kind"]["type"], "temporal");
    assert_eq!(figure["traces"][0]["mode"], "markers");
    assert_eq!(figure["traces"][0]["hover_template"], "Temp (C): %{y} C");
    assert_eq!(figure["traces"][1]["axis"], "secondary");
}

#[test]
fn test_end_to_end_csv_line_chart_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_sheetplot(
        &["test/weather.csv", "--y", "Temp (C)", "--out", dir.path().to_str().unwrap()],
        None,
    );
    assert!(output.status.success(), "Failed: {}", String::from_utf8_lossy(&output.stderr));

    let png = fs::read(dir.path().join("My Graph.png")).unwrap();
    assert!(is_valid_png(&png));
}

#[test]
fn test_end_to_end_bar_chart_categorical() {
    let dir = tempfile::tempdir().unwrap();
    let svg = dir.path().join("sales.svg");
    let output = run_sheetplot(
        &[
            "test/sales.csv",
            "--y", "Revenue (USD)",
            "--kind", "bar",
            "--title", "Sales",
            "--out", dir.path().to_str().unwrap(),
            "--svg", svg.to_str().unwrap(),
        ],
        None,
    );
    assert!(output.status.success(), "Failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(is_valid_png(&fs::read(dir.path().join("Sales.png")).unwrap()));

    let svg = fs::read_to_string(svg).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("North"));
}

#[test]
fn test_end_to_end_no_y_prints_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_sheetplot(&["test/weather.csv", "--out", dir.path().to_str().unwrap()], None);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Select at least one column"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_end_to_end_title_with_separator() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_sheetplot(
        &[
            "test/weather.csv",
            "--y", "Wind (m/s)",
            "--title", "Wind m/s",
            "--out", dir.path().to_str().unwrap(),
        ],
        None,
    );
    assert!(output.status.success(), "Failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("Wind m_s.png").exists());
}

#[test]
fn test_end_to_end_export_size_from_options() {
    let dir = tempfile::tempdir().unwrap();
    let options = dir.path().join("options.json");
    fs::write(&options, r#"{"export": {"width": 640, "height": 480}}"#).unwrap();

    let output = run_sheetplot(
        &[
            "test/sales.csv",
            "--y", "Units",
            "--title", "Units",
            "--options", options.to_str().unwrap(),
            "--out", dir.path().to_str().unwrap(),
        ],
        None,
    );
    assert!(output.status.success(), "Failed: {}", String::from_utf8_lossy(&output.stderr));
    let png = fs::read(dir.path().join("Units.png")).unwrap();
    assert_eq!(png_dimensions(&png), (640, 480));
}

#[test]
fn test_end_to_end_column_not_found() {
    let output = run_sheetplot(&["test/weather.csv", "--y", "Pressure"], None);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("column 'Pressure' not found"));
}

#[test]
fn test_end_to_end_non_numeric_y() {
    let output = run_sheetplot(&["test/notes.csv", "--y", "Comment"], None);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no numeric values"));
}

#[test]
fn test_end_to_end_not_a_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.xlsx");
    fs::write(&bogus, "just text").unwrap();

    let output = run_sheetplot(&[bogus.to_str().unwrap(), "--y", "a"], None);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported spreadsheet"));
}

#[test]
fn test_end_to_end_missing_file() {
    let output = run_sheetplot(&["test/does_not_exist.csv"], None);
    assert!(!output.status.success());
}

#[test]
fn test_interactive_session() {
    let dir = tempfile::tempdir().unwrap();
    let script = format!(
        "columns\n\
         y Temp (C)\n\
         y \"Humidity (%)\"\n\
         y Wind (m/s)\n\
         dual on\n\
         kind scatter\n\
         title \"Week 1\"\n\
         bogus command\n\
         save {}\n\
         quit\n",
        dir.path().display()
    );

    let output = run_sheetplot(&["--interactive", "test/weather.csv"], Some(&script));
    assert!(output.status.success(), "Failed: {}", String::from_utf8_lossy(&output.stderr));

    let out = stdout(&output);
    assert!(out.contains("Select at least one column"));
    assert!(out.contains("  1  Temp (C)"));
    assert!(out.contains("y (right): Humidity (%)"));
    assert!(!out.contains("Wind (m/s) ["));
    assert!(out.contains("cannot parse 'bogus command'"));

    let png = fs::read(dir.path().join("Week 1.png")).unwrap();
    assert!(is_valid_png(&png));
    assert_eq!(png_dimensions(&png), (1000, 600));
}

#[test]
fn test_interactive_errors_do_not_end_session() {
    let script = "load test/does_not_exist.csv\n\
                  save\n\
                  load test/sales.csv\n\
                  y Nope\n\
                  y Units\n\
                  show\n";

    let output = run_sheetplot(&["--interactive"], Some(script));
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("Upload a spreadsheet"));
    assert!(out.contains("error: cannot read test/does_not_exist.csv"));
    assert!(out.contains("error: cannot export image: no chart has been rendered yet"));
    assert!(out.contains("error: column 'Nope' not found"));
    assert!(out.contains("y (left): Units"));
}

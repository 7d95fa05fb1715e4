//! Integration tests for the `probe` subcommand.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("qbank").unwrap()
}

/// A PDF with one page per entry; an empty entry makes a page with no text.
fn pdf_with_pages(contents: &[&str]) -> Vec<u8> {
    use lopdf::{Object, Stream, dictionary};

    let mut doc = lopdf::Document::with_version("1.5");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources = dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(font_id),
        },
    };

    let mut page_ids = Vec::new();
    for text in contents {
        let content = if text.is_empty() {
            Vec::new()
        } else {
            format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET").into_bytes()
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ];
        page_ids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => media_box,
            "Contents" => Object::Reference(content_id),
            "Resources" => resources.clone(),
        }));
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        "Count" => Object::Integer(page_ids.len() as i64),
    };
    let pages_id = doc.add_object(pages_dict);

    for page_id in &page_ids {
        if let Ok(page_obj) = doc.get_object_mut(*page_id) {
            if let Ok(dict) = page_obj.as_dict_mut() {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

const QUESTION: &str =
    "A block of mass m slides down a frictionless incline of angle theta from rest";

fn write_pdf(contents: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exam.pdf");
    std::fs::write(&path, pdf_with_pages(contents)).unwrap();
    (dir, path)
}

#[test]
fn text_report_marks_scanned_pages() {
    let (_dir, path) = write_pdf(&["", QUESTION]);
    cmd()
        .arg("probe")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("page   1  scan"))
        .stdout(predicate::str::contains("page   2  text"))
        .stdout(predicate::str::contains("text layer from page 2"));
}

#[test]
fn scanned_pdf_suggests_rendering() {
    let (_dir, path) = write_pdf(&["", "p. 2"]);
    cmd()
        .arg("probe")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("no text layer"));
}

#[test]
fn json_report() {
    let (_dir, path) = write_pdf(&[QUESTION]);
    let output = cmd()
        .arg("probe")
        .arg(&path)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["page_count"], 1);
    assert_eq!(report["scanned"], false);
    assert_eq!(report["pages"][0]["number"], 1);
    assert_eq!(report["pages"][0]["has_text_layer"], true);
}

#[test]
fn missing_file() {
    cmd()
        .args(["probe", "/nonexistent/exam.pdf"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: file not found"));
}

#[test]
fn not_a_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, b"plain text, not a PDF").unwrap();
    cmd()
        .arg("probe")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read PDF"));
}

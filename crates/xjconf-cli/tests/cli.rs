use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../xjconf/tests/fixtures");

fn check() -> Result<Command, Box<dyn std::error::Error>> {
    Ok(cargo_bin_cmd!("xjconf-check"))
}

#[test]
fn test_accepts_document_with_includes() -> Result<(), Box<dyn std::error::Error>> {
    check()?
        .arg("--defines")
        .arg(format!("{FIXTURES}/defines.xml"))
        .arg(format!("{FIXTURES}/cluster.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"))
        .stdout(predicate::str::contains("root <cluster>"));
    Ok(())
}

#[test]
fn test_reports_missing_attribute() -> Result<(), Box<dyn std::error::Error>> {
    check()?
        .arg("--defines")
        .arg(format!("{FIXTURES}/defines.xml"))
        .arg(format!("{FIXTURES}/broken.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("port"));
    Ok(())
}

#[test]
fn test_reports_unknown_tag() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let document = dir.path().join("doc.xml");
    fs::write(&document, "<list><entry>a</entry></list>")?;

    check()?
        .arg("--defines")
        .arg(format!("{FIXTURES}/defines.xml"))
        .arg(&document)
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry"));
    Ok(())
}

#[test]
fn test_rejects_duplicate_keys_on_request() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let document = dir.path().join("doc.xml");
    fs::write(
        &document,
        r#"<cluster><server id="a" port="1"/><server id="a" port="2"/></cluster>"#,
    )?;

    let defines = format!("{FIXTURES}/defines.xml");
    check()?
        .arg("--defines")
        .arg(&defines)
        .arg(&document)
        .assert()
        .success();
    check()?
        .arg("--defines")
        .arg(&defines)
        .arg("--reject-duplicate-keys")
        .arg(&document)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate"));
    Ok(())
}

#[test]
fn test_invalid_definitions() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let defines = dir.path().join("defines.xml");
    fs::write(&defines, "<defines><tag name=\"a\"/></defines>")?;

    check()?
        .arg("--defines")
        .arg(&defines)
        .arg(format!("{FIXTURES}/list.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid definitions"));
    Ok(())
}

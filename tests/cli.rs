use assert_cmd::Command;
use predicates::prelude::*;

fn comptoir(data_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("comptoir").unwrap();
    cmd.env("COMPTOIR_DATA_DIR", data_dir);
    cmd
}

fn write_export(dir: &std::path::Path, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

#[test]
fn test_ingest_and_list_quotations() {
    let dir = tempfile::tempdir().unwrap();
    let export = write_export(
        dir.path(),
        "export.csv",
        &[
            "\u{feff}Date;C.;Num client;Client;Référence;Famille;Qté;PU;Total TTC;;Vendeur;;Total doc;Paire;Status",
            "05/01/2024;;C1;Client C1;F0001;VER;1;;12,50;;JDU;;150,00;;Facture",
            "05/01/2024;;C2;Client C2;D0001;VER;1;;99,00;;JDU;;99,00;;Devis validé",
        ],
    );

    comptoir(dir.path())
        .arg("ingest")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 invoice lines, 1 quotation lines"))
        .stdout(predicate::str::contains("1 headers created"));

    comptoir(dir.path())
        .arg("quotations")
        .assert()
        .success()
        .stdout(predicate::str::contains("C2"))
        .stdout(predicate::str::contains("yes"));
}

#[test]
fn test_reingest_same_file_does_not_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let export = write_export(
        dir.path(),
        "export.csv",
        &["05/01/2024;;C1;Client C1;F0001;VER;1;;12,50;;JDU;;150,00;;Facture"],
    );

    comptoir(dir.path()).arg("ingest").arg(&export).assert().success();
    comptoir(dir.path())
        .arg("ingest")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 invoice lines"))
        .stdout(predicate::str::contains("0 sellers created"));
}

#[test]
fn test_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    comptoir(dir.path())
        .arg("ingest")
        .arg("does-not-exist.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_export_without_valid_dates_fails() {
    let dir = tempfile::tempdir().unwrap();
    let export = write_export(dir.path(), "empty.csv", &["garbage;line"]);
    comptoir(dir.path())
        .arg("ingest")
        .arg(&export)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No valid dates"));
}

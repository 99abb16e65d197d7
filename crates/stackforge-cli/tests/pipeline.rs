//! End-to-end pipeline tests driving the built binaries over a temp dir.

use std::fs;
use std::process::Command;

use tempfile::tempdir;

#[test]
fn build_compiles_translates_and_assembles_a_single_file() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("Main.source");
    fs::write(
        &source_path,
        indoc::indoc! {"
            class Main {
                function void main() {
                    do Output.printInt(2);
                    return;
                }
            }
        "},
    )
    .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sf-build"))
        .arg(&source_path)
        .status()
        .unwrap();
    assert!(status.success());

    let vm_text = fs::read_to_string(dir.path().join("Main.vm")).unwrap();
    assert!(vm_text.contains("call Output.printInt 1"));

    let asm_text = fs::read_to_string(dir.path().join("Main.asm")).unwrap();
    assert!(asm_text.lines().any(|l| l.starts_with('@') || l.starts_with('(')));

    let bin_text = fs::read_to_string(dir.path().join("Main.bin")).unwrap();
    for line in bin_text.lines() {
        assert_eq!(line.len(), 16);
        assert!(line.chars().all(|c| c == '0' || c == '1'));
    }
}

#[test]
fn compile_dump_xml_writes_a_parse_tree_sibling() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("Main.source");
    fs::write(&source_path, "class Main { function void main() { return; } }").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sf-compile"))
        .arg(&source_path)
        .arg("--dump-xml")
        .status()
        .unwrap();
    assert!(status.success());

    let xml_text = fs::read_to_string(dir.path().join("Main.xml")).unwrap();
    assert!(xml_text.starts_with("<class>\n"));
    assert!(xml_text.contains("<identifier> Main </identifier>\n"));
}

#[test]
fn compile_without_dump_xml_leaves_no_xml_sibling() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("Main.source");
    fs::write(&source_path, "class Main { function void main() { return; } }").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sf-compile"))
        .arg(&source_path)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(!dir.path().join("Main.xml").exists());
}

#[test]
fn compile_error_renders_a_source_snippet() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("Main.source");
    fs::write(
        &source_path,
        indoc::indoc! {"
            class Main {
                function void main() {
                    let x = 1;
                    return;
                }
            }
        "},
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sf-compile")).arg(&source_path).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("undeclared identifier 'x'"));
    assert!(stderr.contains("let x = 1;"));
}

#[test]
fn assemble_rejects_an_unknown_comp_mnemonic() {
    let dir = tempdir().unwrap();
    let asm_path = dir.path().join("bad.asm");
    fs::write(&asm_path, "D=Q\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sf-assemble"))
        .arg(&asm_path)
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!dir.path().join("bad.bin").exists());
}

#[test]
fn vmtranslate_single_file_has_no_bootstrap() {
    let dir = tempdir().unwrap();
    let vm_path = dir.path().join("Main.vm");
    fs::write(&vm_path, "push constant 1\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sf-vmtranslate"))
        .arg(&vm_path)
        .status()
        .unwrap();
    assert!(status.success());

    let asm_text = fs::read_to_string(dir.path().join("Main.asm")).unwrap();
    assert!(!asm_text.contains("Sys.init"));
}

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

fn mk_temp_dir(name: &str) -> PathBuf {
    let mut dir = env::temp_dir();
    dir.push(format!("ecce-test-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents.as_bytes()).unwrap();
}

fn read_file(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn command_edits_file_in_place() {
    let dir = mk_temp_dir("in_place");
    let file = dir.join("f.txt");
    write_file(&file, "hello\nworld\n");

    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin)
        .arg(&file)
        .arg("-command")
        .arg("e5;i/HELLO/;%c")
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(read_file(&file), "HELLO\nworld\n");

    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.starts_with("Ecce\n"));
    assert!(stderr.contains("HELLO^"));
    assert!(stderr.contains("completing."));
    assert!(out.stdout.is_empty());
}

#[test]
fn output_goes_to_second_file() {
    let dir = mk_temp_dir("to");
    let input = dir.join("in.txt");
    let output = dir.join("out.txt");
    write_file(&input, "one\ntwo\nthree\n");

    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin)
        .arg(&input)
        .arg("-to")
        .arg(&output)
        .arg("--command")
        .arg("m;k;%c")
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(read_file(&input), "one\ntwo\nthree\n");
    assert_eq!(read_file(&output), "one\nthree\n");
}

#[test]
fn stdin_to_stdout_needs_a_command() {
    let bin = env!("CARGO_BIN_EXE_ecce");

    let out = Command::new(bin).arg("-").output().unwrap();
    assert_eq!(out.status.code(), Some(1));

    let mut child = Command::new(bin)
        .arg("-")
        .arg("-")
        .arg("-command")
        .arg("f/b/ i/x/;%c")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"abc\n").unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "axbc\n");
}

#[test]
fn hex_command() {
    let dir = mk_temp_dir("hex");
    let file = dir.join("f.txt");
    write_file(&file, "abc\n");

    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin)
        .arg(&file)
        .arg("-hex-command")
        .arg("653b2563")
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(read_file(&file), "bc\n");

    let out = Command::new(bin)
        .arg(&file)
        .arg("-hex-command")
        .arg("6")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn missing_input_file() {
    let dir = mk_temp_dir("missing");
    let file = dir.join("nope.txt");

    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin).arg(&file).arg("-command").arg("%c").output().unwrap();
    assert_eq!(out.status.code(), Some(30));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("not found"));
}

#[test]
fn no_input_file() {
    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin).output().unwrap();
    assert_eq!(out.status.code(), Some(30));

    let out = Command::new(bin).arg("a.txt").arg("-bogus").arg("x").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn abort_leaves_file_alone() {
    let dir = mk_temp_dir("abort");
    let file = dir.join("f.txt");
    write_file(&file, "keep\n");

    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin).arg(&file).arg("-command").arg("k;%a").output().unwrap();
    assert_eq!(out.status.code(), Some(60));
    assert_eq!(read_file(&file), "keep\n");
}

#[test]
fn failures_are_reported_and_editing_goes_on() {
    let dir = mk_temp_dir("failure");
    let file = dir.join("f.txt");
    write_file(&file, "ab\n");

    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin)
        .arg(&file)
        .arg("-command")
        .arg("r9;q;i/x/;%c")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("* Failure: r"));
    assert!(stderr.contains("* Command q"));
    assert_eq!(read_file(&file), "abx\n");
}

#[test]
fn log_records_commands() {
    let dir = mk_temp_dir("log");
    let file = dir.join("f.txt");
    let log = dir.join("cmds.log");
    write_file(&file, "abc\n");

    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin)
        .arg(&file)
        .arg("-log")
        .arg(&log)
        .arg("-command")
        .arg("e;%c")
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(read_file(&log), "e;%c\n");
}

#[test]
fn end_of_input_saves_a_backup() {
    let dir = mk_temp_dir("abandon");
    let file = dir.join("f.txt");
    write_file(&file, "abc\n");

    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin).arg(&file).arg("-command").arg("e").output().unwrap();
    assert_eq!(out.status.code(), Some(50));
    assert_eq!(read_file(&file), "abc\n");

    let stderr = String::from_utf8(out.stderr).unwrap();
    let backup = stderr
        .lines()
        .find_map(|l| l.strip_prefix("Ecce abandoned: saving to "))
        .unwrap();
    assert_eq!(read_file(Path::new(backup)), "bc\n");
    let _ = fs::remove_file(backup);
}

#[test]
fn bad_options_exit_with_one() {
    let dir = mk_temp_dir("size");
    let file = dir.join("f.txt");
    write_file(&file, "abc\n");

    let bin = env!("CARGO_BIN_EXE_ecce");
    let out = Command::new(bin).arg(&file).arg("-size").arg("12q").output().unwrap();
    assert_eq!(out.status.code(), Some(1));

    let out = Command::new(bin)
        .arg(&file)
        .arg("-size")
        .arg("4")
        .arg("-command")
        .arg("%c")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(60));
}

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("bloom"))
}

#[test]
fn create_add_check_reset() {
    let tmp = tempdir().expect("tempdir");
    let file = tmp.path().join("seen.bloom");
    let file = file.to_str().unwrap();

    cli_cmd()
        .args(["create", "--file", file, "--entries", "1000", "--error", "0.01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bits=9592").and(predicate::str::contains("hashes=7")));

    cli_cmd()
        .args(["add", "--file", file, "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha: added"));

    cli_cmd()
        .args(["add", "--file", file, "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha: present"));

    cli_cmd()
        .args(["check", "--file", file, "alpha", "beta"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha: yes").and(predicate::str::contains("beta: no")));

    cli_cmd().args(["reset", "--file", file]).assert().success();

    cli_cmd()
        .args(["check", "--file", file, "alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha: no"));
}

#[test]
fn create_refuses_to_clobber() {
    let tmp = tempdir().expect("tempdir");
    let file = tmp.path().join("f.bloom");
    let file = file.to_str().unwrap();

    cli_cmd().args(["create", "--file", file]).assert().success();
    cli_cmd()
        .args(["create", "--file", file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    cli_cmd().args(["create", "--file", file, "--force"]).assert().success();
}

#[test]
fn hex_keys_match_plain_keys() {
    let tmp = tempdir().expect("tempdir");
    let file = tmp.path().join("f.bloom");
    let file = file.to_str().unwrap();

    cli_cmd().args(["create", "--file", file]).assert().success();
    cli_cmd().args(["add", "--file", file, "abc"]).assert().success();
    cli_cmd()
        .args(["check", "--file", file, "--hex", "616263"])
        .assert()
        .success()
        .stdout(predicate::str::contains("616263: yes"));
}

#[test]
fn merge_unions_and_rejects_mismatch() {
    let tmp = tempdir().expect("tempdir");
    let a = tmp.path().join("a.bloom");
    let b = tmp.path().join("b.bloom");
    let c = tmp.path().join("c.bloom");
    let (a, b, c) = (a.to_str().unwrap(), b.to_str().unwrap(), c.to_str().unwrap());

    cli_cmd().args(["create", "--file", a]).assert().success();
    cli_cmd().args(["create", "--file", b]).assert().success();
    cli_cmd().args(["create", "--file", c, "--entries", "50000"]).assert().success();
    cli_cmd().args(["add", "--file", a, "left"]).assert().success();
    cli_cmd().args(["add", "--file", b, "right"]).assert().success();

    cli_cmd().args(["merge", "--file", a, "--other", b]).assert().success();
    cli_cmd()
        .args(["check", "--file", a, "left", "right"])
        .assert()
        .success()
        .stdout(predicate::str::contains("left: yes").and(predicate::str::contains("right: yes")));

    cli_cmd()
        .args(["merge", "--file", a, "--other", c])
        .assert()
        .failure()
        .stderr(predicate::str::contains("incompatible filters"));
}

#[test]
fn info_json_and_explicit_size() {
    let tmp = tempdir().expect("tempdir");
    let file = tmp.path().join("f.bloom");
    let file = file.to_str().unwrap();

    cli_cmd()
        .args(["create", "--file", file, "--bits", "1001", "--hashes", "4"])
        .assert()
        .success();
    cli_cmd()
        .args(["info", "--file", file, "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"bits\": 1008").and(predicate::str::contains("\"hashes\": 4")));
}

#[test]
fn create_from_config_file() {
    let tmp = tempdir().expect("tempdir");
    let cfg = tmp.path().join("bloom.json");
    std::fs::write(&cfg, r#"{"entries": 1000, "error": 0.01}"#).unwrap();
    let file = tmp.path().join("f.bloom");

    cli_cmd()
        .args(["create", "--file", file.to_str().unwrap(), "--config", cfg.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("bits=9592"));
}

#[test]
fn dump_goes_to_stderr() {
    let tmp = tempdir().expect("tempdir");
    let file = tmp.path().join("f.bloom");
    let file = file.to_str().unwrap();

    cli_cmd().args(["create", "--file", file]).assert().success();
    cli_cmd()
        .args(["dump", "--file", file])
        .assert()
        .success()
        .stderr(predicate::str::contains("->hash functions = 7"));
}

#[test]
fn corrupt_image_is_reported() {
    let tmp = tempdir().expect("tempdir");
    let file = tmp.path().join("f.bloom");
    std::fs::write(&file, b"not a bloom image").unwrap();

    cli_cmd()
        .args(["check", "--file", file.to_str().unwrap(), "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt image"));
}

#[test]
fn invalid_error_rate_fails() {
    let tmp = tempdir().expect("tempdir");
    let file = tmp.path().join("f.bloom");
    cli_cmd()
        .args(["create", "--file", file.to_str().unwrap(), "--error", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid parameters"));
}

#[test]
fn debug_log_follows_rust_log() {
    let tmp = tempdir().expect("tempdir");
    let file = tmp.path().join("f.bloom");
    let file = file.to_str().unwrap();

    cli_cmd().args(["create", "--file", file]).assert().success();
    cli_cmd()
        .env("RUST_LOG", "debug")
        .env("NO_COLOR", "1")
        .args(["check", "--file", file, "a", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("checking keys").not())
        .stderr(predicate::str::contains("checking keys"));
    cli_cmd()
        .env_remove("RUST_LOG")
        .args(["check", "--file", file, "a"])
        .assert()
        .success()
        .stderr(predicate::str::contains("checking keys").not());
}

#[test]
fn version_prints() {
    cli_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("bloom "));
}

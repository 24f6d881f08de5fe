use assert_cmd::Command;
use predicates::prelude::*;

fn curator() -> Command {
    let mut cmd = Command::cargo_bin("curator").unwrap();
    cmd.env_remove("CURATOR_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    curator()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("publish"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn missing_repository_exits_3() {
    curator()
        .args(["status", "--repo", "/definitely/not/a/curator/repo"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Cannot resolve path"));
}

#[test]
fn missing_explicit_config_exits_2() {
    let tmp = tempfile::tempdir().unwrap();
    curator()
        .arg("status")
        .arg("--repo")
        .arg(tmp.path())
        .arg("--config")
        .arg(tmp.path().join("missing.toml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn invalid_config_exits_2() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("curator.toml"),
        "[vcs]\nmainline_ref = \"\"\ncommit_prefix = \"[KG]\"\ntimeout_secs = 5\n",
    )
    .unwrap();
    curator()
        .arg("status")
        .arg("--repo")
        .arg(tmp.path())
        .assert()
        .code(2);
}

#[test]
fn status_on_empty_workspace() {
    let tmp = tempfile::tempdir().unwrap();
    curator()
        .arg("status")
        .arg("--repo")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects"));
}

#[test]
fn unknown_batch_exits_3() {
    let tmp = tempfile::tempdir().unwrap();
    curator()
        .args(["diff", "acme", "b1", "--repo"])
        .arg(tmp.path())
        .assert()
        .code(3);
}

#[test]
fn invalid_batch_id_exits_4() {
    let tmp = tempfile::tempdir().unwrap();
    curator()
        .args(["review", "acme", "../b1", "1", "--repo"])
        .arg(tmp.path())
        .assert()
        .code(4);
}

#[test]
fn verbose_rollback_logs_progress() {
    let tmp = tempfile::tempdir().unwrap();
    curator()
        .args(["-v", "rollback", "deadbeef", "--repo"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Rolling back working tree"));
}

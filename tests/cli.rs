use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn zipcn() -> Command {
    Command::cargo_bin("zipcn").unwrap()
}

#[test]
fn compress_then_extract() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let proj = work.path().join("proj");
    fs::create_dir_all(proj.join("sub"))?;
    fs::write(proj.join("a.txt"), "hi")?;

    // Default destination is <name>.zip in the current directory.
    zipcn()
        .current_dir(work.path())
        .arg("-v")
        .arg("proj")
        .assert()
        .success()
        .stdout(predicate::str::contains("adding:"));
    assert!(work.path().join("proj.zip").is_file());

    zipcn()
        .current_dir(work.path())
        .args(["-x", "-v", "-d", "out", "proj.zip"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Charset: UTF-8")
                .and(predicate::str::contains("inflating:")),
        );

    assert_eq!(fs::read_to_string(work.path().join("out/proj/a.txt"))?, "hi");
    assert!(work.path().join("out/proj/sub").is_dir());
    Ok(())
}

#[test]
fn gbk_round_trip_and_listing() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let src = work.path().join("docs");
    fs::create_dir(&src)?;
    fs::write(src.join("文件.txt"), "x")?;
    let archive = work.path().join("docs.zip");

    zipcn().arg("-c").arg("gbk").arg(&src).arg(&archive).assert().success();

    zipcn()
        .args(["-l", "-e", "GBK"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("docs/文件.txt"));

    zipcn()
        .args(["-l", "-v", "-c", "GBK"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Length").and(predicate::str::contains("1 files")));

    let out = work.path().join("out");
    zipcn().args(["-x", "-c", "GBK", "-d"]).arg(&out).arg(&archive).assert().success();
    assert_eq!(fs::read_to_string(out.join("docs/文件.txt"))?, "x");
    Ok(())
}

#[test]
fn verbose_listing_marks_utf8_names() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let src = work.path().join("notes");
    fs::create_dir(&src)?;
    fs::write(src.join("笔记.txt"), "x")?;

    let utf8_zip = work.path().join("utf8.zip");
    zipcn().arg(&src).arg(&utf8_zip).assert().success();
    zipcn()
        .args(["-l", "-v"])
        .arg(&utf8_zip)
        .assert()
        .success()
        .stdout(predicate::str::contains("utf8  notes/笔记.txt"));

    let gbk_zip = work.path().join("gbk.zip");
    zipcn().args(["-c", "GBK"]).arg(&src).arg(&gbk_zip).assert().success();
    // Listed without -c GBK, the raw names are shown lossily instead of failing.
    zipcn()
        .args(["-l", "-v"])
        .arg(&gbk_zip)
        .assert()
        .success()
        .stdout(predicate::str::contains("utf8").not().and(predicate::str::contains("\u{fffd}")));
    Ok(())
}

#[test]
fn extracts_from_standard_input() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let src = work.path().join("piped");
    fs::create_dir(&src)?;
    fs::write(src.join("f"), "stdin")?;
    let archive = work.path().join("piped.zip");
    zipcn().arg(&src).arg(&archive).assert().success();

    let out = work.path().join("out");
    zipcn()
        .args(["-x", "-d"])
        .arg(&out)
        .write_stdin(fs::read(&archive)?)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(out.join("piped/f"))?, "stdin");
    Ok(())
}

#[test]
fn unsupported_charset_fails_before_touching_the_filesystem()
-> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let src = work.path().join("src");
    fs::create_dir(&src)?;

    zipcn()
        .current_dir(work.path())
        .args(["-c", "latin1", "src", "out.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported charset: latin1"));
    assert_eq!(fs::read_dir(work.path())?.count(), 1);

    zipcn()
        .current_dir(work.path())
        .args(["-x", "-c", "latin1", "-d", "newdir", "missing.zip"])
        .assert()
        .failure();
    assert!(!work.path().join("newdir").exists());
    Ok(())
}

#[test]
fn bad_archive_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let work = tempdir()?;
    let bogus = work.path().join("bogus.zip");
    fs::write(&bogus, "not a zip at all, just text")?;

    zipcn()
        .args(["-x", "-d"])
        .arg(work.path().join("out"))
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid zip archive"));
    Ok(())
}

#[test]
fn too_many_paths_is_a_usage_error() {
    zipcn()
        .args(["-x", "a.zip", "b.zip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at most one archive"));
}

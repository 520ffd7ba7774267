use assert_fs::prelude::*;
use predicates::prelude::*;

const APP_XML: &str = r#"<translation>
  <culture name="en">
    <text key="greeting">Hello, {name}!</text>
    <text key="items" count="1" mod="10">one item</text>
    <text key="items">{#} items</text>
  </culture>
  <culture name="de">
    <text key="greeting">Hallo, {name}!</text>
  </culture>
</translation>
"#;

const BROKEN_XML: &str = r#"<translation>
  <text key="ok">fine</text>
  <text key="bad" count="lots">broken</text>
</translation>
"#;

fn tx() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("tx");
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn dictionary() -> assert_fs::TempDir {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("lang/app.xml").write_str(APP_XML).unwrap();
    temp
}

#[test]
fn resolve_with_count_and_args() {
    let temp = dictionary();

    tx().current_dir(temp.path())
        .args(["resolve", "--dir", "lang", "--culture", "en", "--count", "31", "items"])
        .assert()
        .success()
        .stdout("one item\n");

    tx().current_dir(temp.path())
        .args(["resolve", "-d", "lang", "-c", "de-ch", "-a", "name=Bob", "greeting"])
        .assert()
        .success()
        .stdout("Hallo, Bob!\n");
}

#[test]
fn resolve_falls_back_to_primary() {
    let temp = dictionary();

    tx().current_dir(temp.path())
        .args(["resolve", "-d", "lang", "-c", "fr", "--primary", "en", "-n", "4", "items"])
        .assert()
        .success()
        .stdout("4 items\n");
}

#[test]
fn unresolved_key_fails() {
    let temp = dictionary();

    tx().current_dir(temp.path())
        .args(["resolve", "-d", "lang", "-c", "en", "nope"])
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("No text for"));
}

#[test]
fn resolve_reads_tx_toml() {
    let temp = dictionary();
    temp.child("tx.toml")
        .write_str("primary_culture = \"en\"\ndictionary_dir = \"lang\"\nfile_prefix = \"app\"\n")
        .unwrap();

    tx().current_dir(temp.path())
        .args(["resolve", "-c", "it", "-a", "name=Ada", "greeting"])
        .assert()
        .success()
        .stdout("Hello, Ada!\n");
}

#[test]
fn missing_configuration_is_an_error() {
    let temp = assert_fs::TempDir::new().unwrap();

    tx().current_dir(temp.path())
        .args(["resolve", "greeting"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("tx.toml"));
}

#[test]
fn keys_and_cultures() {
    let temp = dictionary();

    tx().current_dir(temp.path())
        .args(["keys", "-d", "lang", "-c", "en"])
        .assert()
        .success()
        .stdout("greeting\nitems\n");

    tx().current_dir(temp.path())
        .args(["keys", "-d", "lang", "--cultures"])
        .assert()
        .success()
        .stdout("de\nen\n");
}

#[test]
fn check_passes_clean_files() {
    let temp = dictionary();

    tx().current_dir(temp.path())
        .args(["check", "lang"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files, 4 texts, 0 problems"));
}

#[test]
fn check_reports_problems() {
    let temp = dictionary();
    temp.child("lang/app.de.xml").write_str(BROKEN_XML).unwrap();
    temp.child("lang/broken.en.xml")
        .write_str("<translation><text key=\"a\">A</culture>")
        .unwrap();

    tx().current_dir(temp.path())
        .args(["check", "lang"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("count=\"lots\" is not an integer"))
        .stdout(predicate::str::contains("broken.en.xml"))
        .stdout(predicate::str::contains("3 files, 5 texts, 2 problems"));
}

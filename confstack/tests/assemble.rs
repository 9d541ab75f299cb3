//! End-to-end runs of the assembly pipeline over on-disk trees.

use anyhow::{Result, bail, ensure};
use confstack::emit::to_canonical_json;
use confstack::secrets::KeyMaterial;
use confstack::settings::Settings;
use confstack::{ConfstackError, assemble};
use rstest::{fixture, rstest};
use serde_json::json;
use test_helpers::ejson::TestKeyPair;
use test_helpers::tree::FragmentTree;

#[fixture]
fn keys() -> TestKeyPair {
    TestKeyPair::from_seed(21)
}

fn settings_for(tree: &FragmentTree) -> Settings {
    Settings {
        root_directory: tree.path("root"),
        allow_missing_manifest: true,
        ..Settings::default()
    }
}

fn run(settings: &Settings) -> Result<Vec<u8>> {
    let document = assemble(settings, &settings.decrypter())?;
    Ok(to_canonical_json(&document)?)
}

#[rstest]
fn repeated_runs_are_byte_identical() -> Result<()> {
    let tree = FragmentTree::new()?;
    tree.write("root/b.yaml", "zeta: 1\nalpha: {y: 2, x: 1}\n")?;
    tree.write("root/a/nested.yaml", "list: [{name: one}, {name: two}]\n")?;
    tree.write("root/c.yaml", "list: [{name: two, extra: true}]\n")?;
    let settings = settings_for(&tree);

    let first = run(&settings)?;
    let second = run(&settings)?;
    ensure!(first == second, "outputs differ between runs");

    let parsed: serde_json::Value = serde_json::from_slice(&first)?;
    let expected = json!({
        "alpha": {"x": 1, "y": 2},
        "list": [{"name": "one"}, {"name": "two", "extra": true}],
        "zeta": 1,
    });
    ensure!(parsed == expected, "unexpected document {parsed}");
    Ok(())
}

#[rstest]
fn extras_precede_root_and_resources_follow() -> Result<()> {
    let tree = FragmentTree::new()?;
    tree.write("first/a.yaml", "winner: first\nonly_first: 1\n")?;
    tree.write("second/a.yaml", "winner: second\n")?;
    tree.write("root/kustomization.yaml", "resources:\n  - ../late\n  - ../later.yaml\n")?;
    tree.write("root/values.yaml", "winner: root\n")?;
    tree.write("late/a.yaml", "winner: late\n")?;
    tree.write("later.yaml", "winner: later\nonly_later: 2\n")?;

    let settings = Settings {
        root_directory: tree.path("root"),
        extra_directories: vec![tree.path("first"), tree.path("second")],
        ..Settings::default()
    };
    let document = assemble(&settings, &settings.decrypter())?;

    ensure!(document.get("winner") == Some(&json!("later")), "resources merge last");
    ensure!(document.get("only_first") == Some(&json!(1)), "extras contribute");
    ensure!(document.get("only_later") == Some(&json!(2)), "file resources contribute");
    Ok(())
}

#[rstest]
fn root_overrides_extra_directories() -> Result<()> {
    let tree = FragmentTree::new()?;
    tree.write("extra/a.yaml", "winner: extra\n")?;
    tree.write("root/a.yaml", "winner: root\n")?;
    let settings = Settings {
        extra_directories: vec![tree.path("extra")],
        ..settings_for(&tree)
    };
    let document = assemble(&settings, &settings.decrypter())?;
    ensure!(document.get("winner") == Some(&json!("root")), "root merges after extras");
    Ok(())
}

#[rstest]
fn secrets_are_merged_as_plaintext(keys: TestKeyPair) -> Result<()> {
    let tree = FragmentTree::new()?;
    let sealed = keys.document(&json!({"database": {"password": "hunter2"}}))?;
    tree.write("root/secrets.ejson", &sealed)?;
    tree.write("root/app.yaml", "database: {host: db, password: placeholder}\n")?;
    let settings = Settings {
        secret_key: Some(KeyMaterial::new(keys.private_hex())),
        ..settings_for(&tree)
    };

    let output = String::from_utf8(run(&settings)?)?;
    let document: serde_json::Value = serde_json::from_str(&output)?;
    ensure!(
        document.pointer("/database/password") == Some(&json!("hunter2")),
        "decrypted value should win: {output}"
    );
    ensure!(document.pointer("/database/host") == Some(&json!("db")), "plain values kept");
    ensure!(!output.contains("EJ["), "ciphertext leaked into the output");
    ensure!(tree.read("root/secrets.ejson")? == sealed, "source secret was modified");
    Ok(())
}

#[rstest]
fn key_directory_resolves_the_private_key(keys: TestKeyPair) -> Result<()> {
    let tree = FragmentTree::new()?;
    let key_dir = tree.path("keys");
    keys.install(&key_dir)?;
    tree.write("root/s.ejson", &keys.document(&json!({"token": "abc"}))?)?;
    let settings = Settings {
        key_dir,
        ..settings_for(&tree)
    };
    let document = assemble(&settings, &settings.decrypter())?;
    ensure!(document.get("token") == Some(&json!("abc")), "token not decrypted");
    Ok(())
}

#[rstest]
fn undecryptable_secret_aborts_the_run(keys: TestKeyPair) -> Result<()> {
    let tree = FragmentTree::new()?;
    tree.write("root/a.yaml", "fine: true\n")?;
    let broken = tree.write("root/b.ejson", "{\"_public_key\": \"not-a-key\"}")?;
    let settings = Settings {
        secret_key: Some(KeyMaterial::new(keys.private_hex())),
        ..settings_for(&tree)
    };
    match assemble(&settings, &settings.decrypter()) {
        Err(ConfstackError::Decrypt { path, .. }) => {
            ensure!(path == broken, "wrong path reported: {path}");
        }
        other => bail!("expected a decrypt failure, got {other:?}"),
    }
    Ok(())
}

#[rstest]
fn missing_manifest_is_fatal_by_default() -> Result<()> {
    let tree = FragmentTree::new()?;
    tree.write("root/a.yaml", "a: 1\n")?;
    let settings = Settings {
        root_directory: tree.path("root"),
        ..Settings::default()
    };
    let result = assemble(&settings, &settings.decrypter());
    ensure!(
        matches!(result, Err(ConfstackError::ManifestMissing { .. })),
        "expected ManifestMissing, got {result:?}"
    );
    Ok(())
}

#[rstest]
fn missing_root_is_reported() -> Result<()> {
    let tree = FragmentTree::new()?;
    let settings = Settings {
        root_directory: tree.path("absent"),
        ..Settings::default()
    };
    let result = assemble(&settings, &settings.decrypter());
    ensure!(
        matches!(result, Err(ConfstackError::SourceNotFound { .. })),
        "expected SourceNotFound, got {result:?}"
    );
    Ok(())
}

#[rstest]
fn strict_parsing_rejects_broken_fragments() -> Result<()> {
    let tree = FragmentTree::new()?;
    tree.write("root/a.yaml", "a: 1\n")?;
    tree.write("root/b.yaml", "b: [\n")?;
    let lenient = settings_for(&tree);
    let document = assemble(&lenient, &lenient.decrypter())?;
    ensure!(document == json!({"a": 1}), "broken fragment should be skipped");

    let strict = Settings {
        strict_parse: true,
        ..settings_for(&tree)
    };
    let result = assemble(&strict, &strict.decrypter());
    ensure!(
        matches!(result, Err(ConfstackError::Parse { .. })),
        "expected Parse, got {result:?}"
    );
    Ok(())
}

#[rstest]
fn empty_root_assembles_an_empty_document() -> Result<()> {
    let tree = FragmentTree::new()?;
    std::fs::create_dir_all(tree.path("root"))?;
    let bytes = run(&settings_for(&tree))?;
    ensure!(bytes == b"{}\n", "unexpected output {:?}", String::from_utf8_lossy(&bytes));
    Ok(())
}

#[rstest]
fn yaml_nulls_prune_keys_across_fragments() -> Result<()> {
    let tree = FragmentTree::new()?;
    tree.write("base/a.yaml", "a: 1\nb: 2\nnested: {keep: 1, drop: 2}\n")?;
    tree.write("root/overlay.yaml", "a: null\nnested:\n  drop: ~\nliteral: 'null'\n")?;
    tree.write("root/more.yaml", "---\nextra: true\n---\nignored: true\n")?;
    let settings = Settings {
        extra_directories: vec![tree.path("base")],
        ..settings_for(&tree)
    };
    let document = assemble(&settings, &settings.decrypter())?;
    let expected = json!({
        "b": 2,
        "nested": {"keep": 1},
        "literal": "null",
        "extra": true,
    });
    ensure!(document == expected, "unexpected document {document}");
    Ok(())
}

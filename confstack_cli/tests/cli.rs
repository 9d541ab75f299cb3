//! Runs the compiled `confstack` binary against temporary fragment trees.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use test_helpers::ejson::TestKeyPair;
use test_helpers::tree::FragmentTree;

const SETTINGS_VARS: &[&str] = &[
    "ROOT_DIRECTORY",
    "EXTRA_DIRECTORIES",
    "EJSON_FILE_REGEX",
    "EJSON_SECRET",
    "EJSON_KEYDIR",
    "VAR_FILE_REGEX",
    "KUSTOMIZE_BUILD_OPTIONS",
    "CONFSTACK_STRICT_PARSE",
    "CONFSTACK_ALLOW_MISSING_MANIFEST",
    "CONFSTACK_IDENTITY_KEYS",
    "CONFSTACK_LOG",
    "ARGOCD_ENV_EXTRA_DIRECTORIES",
    "ARGOCD_ENV_SECRET",
];

#[fixture]
#[expect(clippy::expect_used, reason = "fixture setup failures should abort the test")]
fn tree() -> FragmentTree {
    FragmentTree::new().expect("create fragment tree")
}

/// Builds a `confstack` command with the settings environment cleared.
fn confstack() -> Result<Command> {
    #[expect(deprecated, reason = "cargo_bin is the standard assert_cmd API")]
    let mut cmd = Command::cargo_bin("confstack").context("locate confstack binary")?;
    for var in SETTINGS_VARS {
        cmd.env_remove(var);
    }
    cmd.env("RUST_BACKTRACE", "0");
    Ok(cmd)
}

#[rstest]
fn prints_the_merged_document(tree: FragmentTree) -> Result<()> {
    tree.write("root/kustomization.yaml", "resources:\n  - ../overlay\n")?;
    tree.write("root/base.yaml", "replicas: 1\nimage: app:1\n")?;
    tree.write("overlay/prod.yaml", "replicas: 3\n")?;

    let output = confstack()?
        .arg("--root-directory")
        .arg(tree.path("root"))
        .output()?;
    ensure!(output.status.success(), "run failed: {output:?}");

    let document: Value = serde_json::from_slice(&output.stdout)?;
    ensure!(document.get("replicas") == Some(&json!(3)), "overlay should win");
    ensure!(document.get("image") == Some(&json!("app:1")), "base values kept");
    ensure!(output.stdout.ends_with(b"}\n"), "output ends with a newline");
    Ok(())
}

#[rstest]
fn environment_selects_the_root(tree: FragmentTree) -> Result<()> {
    tree.write("root/a.yaml", "from: env\n")?;
    let output = confstack()?
        .env("ROOT_DIRECTORY", tree.path("root"))
        .env("CONFSTACK_ALLOW_MISSING_MANIFEST", "true")
        .output()?;
    ensure!(output.status.success(), "run failed: {output:?}");
    let document: Value = serde_json::from_slice(&output.stdout)?;
    ensure!(document == json!({"from": "env"}), "unexpected document {document}");
    Ok(())
}

#[rstest]
fn missing_manifest_exits_with_two(tree: FragmentTree) -> Result<()> {
    tree.write("root/a.yaml", "a: 1\n")?;
    let output = confstack()?
        .arg("--root-directory")
        .arg(tree.path("root"))
        .output()?;
    ensure!(output.status.code() == Some(2), "unexpected status: {output:?}");
    ensure!(output.stdout.is_empty(), "no document on failure");
    Ok(())
}

#[rstest]
fn decrypt_failure_exits_with_three_and_prints_nothing(tree: FragmentTree) -> Result<()> {
    let keys = TestKeyPair::from_seed(3);
    tree.write("root/a.yaml", "a: 1\n")?;
    tree.write("root/secrets.ejson", &keys.document(&json!({"token": "t0p-s3cret"}))?)?;
    let output = confstack()?
        .arg("--root-directory")
        .arg(tree.path("root"))
        .arg("--allow-missing-manifest")
        .env("EJSON_SECRET", TestKeyPair::from_seed(4).private_hex())
        .output()?;

    ensure!(output.status.code() == Some(3), "unexpected status: {output:?}");
    ensure!(output.stdout.is_empty(), "no document on failure");
    let stderr = String::from_utf8_lossy(&output.stderr);
    ensure!(stderr.contains("secrets.ejson"), "error names the file: {stderr}");
    ensure!(
        !stderr.contains(&TestKeyPair::from_seed(4).private_hex()),
        "error leaked key material"
    );
    Ok(())
}

#[rstest]
fn secrets_decrypt_with_the_environment_key(tree: FragmentTree) -> Result<()> {
    let keys = TestKeyPair::from_seed(5);
    tree.write("root/secrets.ejson", &keys.document(&json!({"token": "opened"}))?)?;
    let output = confstack()?
        .arg("--root-directory")
        .arg(tree.path("root"))
        .arg("--allow-missing-manifest")
        .env("ARGOCD_ENV_SECRET", keys.private_hex())
        .output()?;
    ensure!(output.status.success(), "run failed: {output:?}");
    let document: Value = serde_json::from_slice(&output.stdout)?;
    ensure!(document.get("token") == Some(&json!("opened")), "token not decrypted");
    Ok(())
}

#[rstest]
fn invalid_settings_exit_with_usage_status(tree: FragmentTree) -> Result<()> {
    let output = confstack()?
        .arg("--root-directory")
        .arg(tree.root())
        .env("CONFSTACK_STRICT_PARSE", "perhaps")
        .output()?;
    ensure!(output.status.code() == Some(64), "unexpected status: {output:?}");
    ensure!(output.stdout.is_empty(), "no document on failure");
    Ok(())
}

#[rstest]
fn output_flag_writes_a_file(tree: FragmentTree) -> Result<()> {
    tree.write("root/a.yaml", "b: 2\na: 1\n")?;
    let target = tree.path("out.json");
    let output = confstack()?
        .arg("--root-directory")
        .arg(tree.path("root"))
        .arg("--allow-missing-manifest")
        .arg("--output")
        .arg(&target)
        .output()?;
    ensure!(output.status.success(), "run failed: {output:?}");
    ensure!(output.stdout.is_empty(), "document goes to the file");
    ensure!(
        tree.read("out.json")? == "{\n \"a\": 1,\n \"b\": 2\n}\n",
        "unexpected file contents"
    );
    Ok(())
}

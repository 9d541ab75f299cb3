//! Command-line interface definitions for `confstack`.
//!
//! Every option mirrors a settings field and serializes under that field's
//! name, so the parsed arguments can be layered over the environment. Options
//! that were not given are skipped during serialization and leave the
//! environment value in place.

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use serde::Serialize;

/// Parsed CLI arguments for `confstack`.
#[derive(Debug, Default, Parser, Serialize)]
#[command(name = "confstack")]
#[command(about = "Assemble one JSON document from layered YAML and EJSON fragments")]
#[command(version)]
pub struct Cli {
    /// Directory tree to assemble (overrides `ROOT_DIRECTORY`).
    #[arg(long, value_name = "path")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_directory: Option<Utf8PathBuf>,

    /// Directory merged before the root; repeat to add more, in order.
    #[arg(long = "extra-directory", value_name = "path")]
    #[serde(rename = "extra_directories", skip_serializing_if = "Vec::is_empty")]
    pub extra_directories: Vec<Utf8PathBuf>,

    /// Extension of files to decrypt (overrides `EJSON_FILE_REGEX`).
    #[arg(long, value_name = "suffix")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_suffix: Option<String>,

    /// Directory holding EJSON private keys (overrides `EJSON_KEYDIR`).
    #[arg(long, value_name = "path")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_dir: Option<Utf8PathBuf>,

    /// Identity key for sequence merging; repeat for fallbacks.
    #[arg(long = "identity-key", value_name = "key")]
    #[serde(rename = "identity_keys", skip_serializing_if = "Vec::is_empty")]
    pub identity_keys: Vec<String>,

    /// Fail on fragments that do not parse instead of skipping them.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub strict_parse: bool,

    /// Continue without manifest resources when no manifest exists.
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub allow_missing_manifest: bool,

    /// Write the document to this file instead of standard output.
    #[arg(short, long, value_name = "path")]
    #[serde(skip)]
    pub output: Option<Utf8PathBuf>,

    /// Raise log verbosity when `CONFSTACK_LOG` is unset (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    #[serde(skip)]
    pub verbose: u8,
}

//! Shared fixtures for faqbot CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

const CORPUS: &str = r#"{
  "categories": [
    { "id": 1, "name": "Compte" },
    { "id": 2, "name": "Scolarité" }
  ],
  "faqs": [
    {
      "id": 1,
      "categoryId": 1,
      "question": "Comment réinitialiser mon mot de passe ?",
      "answer": "Utilisez le lien « Mot de passe oublié ».",
      "popularity": 3
    },
    {
      "id": 2,
      "categoryId": 2,
      "question": "Où consulter mes notes d'examen ?",
      "answer": "Sur l'espace numérique de travail.",
      "popularity": 1
    },
    {
      "id": 3,
      "categoryId": 2,
      "question": "Comment obtenir un certificat de scolarité ?",
      "answer": "Au guichet de la scolarité.",
      "popularity": 1
    }
  ]
}"#;

const RULES: &str = r#"- intent: greeting
  patterns: [bonjour, salut]
  response: "Bonjour ! Comment puis-je vous aider ?"
- intent: thanks
  patterns: [merci]
  response: "Avec plaisir !"
"#;

/// A data directory with the sample corpus and rules.
pub fn data_dir() -> TempDir {
    let temp = TempDir::new().expect("create temp dir");
    fs::write(temp.path().join("corpus.json"), CORPUS).expect("write corpus");
    fs::write(temp.path().join("rules.yaml"), RULES).expect("write rules");
    temp
}

/// An empty data directory.
pub fn empty_data_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

/// `faqbot` pointed at `data_dir`, isolated from the user's config and env.
#[allow(deprecated)]
pub fn faqbot(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("faqbot").expect("faqbot binary should exist");
    cmd.env("FAQBOT_CONFIG", data_dir.join("no-such-config.yaml"))
        .env_remove("FAQBOT_DATA_DIR")
        .env_remove("FAQBOT_VERBOSE")
        .env("NO_COLOR", "1")
        .arg("--color")
        .arg("never")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

/// Run a command with `--json` and parse its stdout.
pub fn json_output(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--json").output().expect("run faqbot");
    assert!(
        output.status.success(),
        "faqbot failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

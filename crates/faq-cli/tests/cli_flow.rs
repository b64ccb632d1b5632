//! End-to-end tests of the faqbot commands against a file-backed data directory.

mod common;

use predicates::prelude::*;

use common::{data_dir, empty_data_dir, faqbot, json_output};

// ============================================================================
// train / reindex
// ============================================================================

#[test]
fn test_train_reports_corpus() {
    let temp = data_dir();

    faqbot(temp.path())
        .arg("train")
        .assert()
        .success()
        .stdout(predicate::str::contains("[ok] Trained vectorizer"))
        .stdout(predicate::str::contains("Documents: 3"));

    assert!(temp.path().join("vectorizer").join("model.bin").exists());
    assert!(temp.path().join("vectors.bin").exists());
}

#[test]
fn test_reindex_reuses_trained_model() {
    let temp = data_dir();
    let trained = json_output(faqbot(temp.path()).arg("train"));
    let reindexed = json_output(faqbot(temp.path()).arg("reindex"));

    assert_eq!(trained["modelId"], reindexed["modelId"]);
    assert_eq!(reindexed["indexed"], 3);
}

#[test]
fn test_train_empty_corpus_fails() {
    let temp = empty_data_dir();

    faqbot(temp.path())
        .arg("train")
        .assert()
        .failure()
        .stderr(predicate::str::contains("corpus is empty"))
        .stderr(predicate::str::contains("Hint:"));
}

// ============================================================================
// ask
// ============================================================================

#[test]
fn test_ask_exact_question() {
    let temp = data_dir();
    faqbot(temp.path()).arg("train").assert().success();

    let response = json_output(
        faqbot(temp.path())
            .arg("ask")
            .arg("Comment réinitialiser mon mot de passe ?"),
    );

    assert_eq!(response["hits"][0]["faqId"], 1);
    assert_eq!(response["hits"][0]["category"], "Compte");
    assert_eq!(response["resolution"]["kind"], "category");
    assert_eq!(response["confidence"], "high");
    assert_eq!(response["reply"], "Utilisez le lien « Mot de passe oublié ».");
    assert!(response["topScore"].as_f64().unwrap() >= 0.6);
}

#[test]
fn test_ask_without_training_trains_lazily() {
    let temp = data_dir();

    let response = json_output(faqbot(temp.path()).arg("ask").arg("certificat de scolarité"));
    assert_eq!(response["hits"][0]["faqId"], 3);
    assert!(temp.path().join("vectorizer").join("model.bin").exists());
}

#[test]
fn test_ask_human_output() {
    let temp = data_dir();

    faqbot(temp.path())
        .arg("ask")
        .arg("Comment réinitialiser mon mot de passe ?")
        .assert()
        .success()
        .stdout(predicate::str::contains("[high] Utilisez le lien"))
        .stdout(predicate::str::contains("Resolution: category `Compte`"))
        .stdout(predicate::str::contains("Score: 1.00"));
}

#[test]
fn test_ask_greeting_uses_rule() {
    let temp = data_dir();

    let response = json_output(faqbot(temp.path()).arg("ask").arg("Bonjour !"));
    assert_eq!(response["resolution"]["kind"], "rule");
    assert_eq!(response["resolution"]["intent"], "greeting");
    assert_eq!(response["reply"], "Bonjour ! Comment puis-je vous aider ?");
    assert_eq!(response["hits"].as_array().unwrap().len(), 0);
}

#[test]
fn test_ask_unknown_words_not_understood() {
    let temp = data_dir();

    let response = json_output(faqbot(temp.path()).arg("ask").arg("xyzzy plugh"));
    assert_eq!(response["resolution"]["kind"], "not_understood");
    assert_eq!(response["confidence"], "low");
    assert!(response["reply"]
        .as_str()
        .unwrap()
        .starts_with("Je n'ai pas compris"));

    faqbot(temp.path())
        .arg("ask")
        .arg("xyzzy plugh")
        .assert()
        .success()
        .stdout(predicate::str::contains("[low]"))
        .stdout(predicate::str::contains("[hint]"));
}

#[test]
fn test_ask_invalid_min_score() {
    let temp = data_dir();

    faqbot(temp.path())
        .args(["ask", "notes", "--min-score", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_score"));
}

#[test]
fn test_ask_empty_corpus_not_trained() {
    let temp = empty_data_dir();

    faqbot(temp.path())
        .args(["ask", "mot de passe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not trained"))
        .stderr(predicate::str::contains("faqbot train"));
}

// ============================================================================
// feedback / stats / rules
// ============================================================================

#[test]
fn test_positive_feedback_reorders_categories() {
    let temp = data_dir();

    let before = json_output(faqbot(temp.path()).arg("stats"));
    assert_eq!(before["categories"][0]["name"], "Compte");

    for _ in 0..2 {
        let stored = json_output(faqbot(temp.path()).args(["feedback", "2", "--positive"]));
        assert_eq!(stored["faqId"], 2);
        assert_eq!(stored["kind"], "positive");
    }

    let after = json_output(faqbot(temp.path()).arg("stats"));
    assert_eq!(after["categories"][0]["name"], "Scolarité");
    assert_eq!(after["categories"][0]["popularity"], 4);
}

#[test]
fn test_feedback_human_output_and_unknown_faq() {
    let temp = data_dir();

    faqbot(temp.path())
        .args(["feedback", "1", "--negative", "--comment", "lien cassé"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded negative feedback for FAQ #1"));

    faqbot(temp.path())
        .args(["feedback", "99", "--positive"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FAQ #99 not found"));

    faqbot(temp.path())
        .args(["feedback", "1"])
        .assert()
        .failure();
}

#[test]
fn test_stats_before_and_after_training() {
    let temp = data_dir();

    let stats = json_output(faqbot(temp.path()).arg("stats"));
    assert_eq!(stats["activeFaqs"], 3);
    assert_eq!(stats["rules"], 2);
    assert!(stats["model"].is_null());

    faqbot(temp.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("No trained vectorizer"));

    faqbot(temp.path()).arg("train").assert().success();

    let stats = json_output(faqbot(temp.path()).arg("stats"));
    assert_eq!(stats["model"]["modelId"], stats["index"]["modelId"]);
    assert_eq!(stats["index"]["entries"], 3);

    faqbot(temp.path())
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("CATEGORIES"))
        .stdout(predicate::str::contains("Scolarité"));
}

#[test]
fn test_rules_listing() {
    let temp = data_dir();

    faqbot(temp.path())
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("greeting"))
        .stdout(predicate::str::contains("bonjour, salut"));

    let empty = empty_data_dir();
    faqbot(empty.path())
        .arg("rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("No conversational rules loaded"));
}

#[test]
fn test_invalid_config_file() {
    let temp = data_dir();
    let config = temp.path().join("config.yaml");
    std::fs::write(&config, "retrieval:\n  topK: [not, a, number]\n").unwrap();

    faqbot(temp.path())
        .env("FAQBOT_CONFIG", &config)
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

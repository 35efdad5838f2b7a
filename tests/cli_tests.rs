use assert_cmd::Command;
use predicates::prelude::*;
use quorum_crypto::{KeyScheme, PrivateKey};
use tempfile::TempDir;

const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
const DAVE: &str = "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy";
const EVE: &str = "5HGjWAeFDfFCWPsjFQdVV2Msvz2XtMktvgocEZcCj68kUMaw";

const TRANSFER_CALL: &str =
    "0x050300e659a7a1628cdd93febc04a4e0646ea20e9f5f0ce097d9a05290d4a9e054df4e0b00a0724e1809";
const TRANSFER_HASH: &str = "0x0491847e080c5166ded52158d50e5123873156cbe39ca7ba5d1c896f3ab0b817";

/// Command isolated from any config file in the user's home
fn quorum(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quorum").unwrap();
    cmd.arg("--config").arg(temp_dir.path().join("config.toml"));
    cmd
}

#[test]
fn test_version_command() {
    let mut cmd = Command::cargo_bin("quorum").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quorum"))
        .stdout(predicate::str::contains("build:"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("quorum").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("multisig extrinsics"))
        .stdout(predicate::str::contains("Commands:"));
}

#[test]
fn test_derive_known_address() {
    let temp_dir = TempDir::new().unwrap();
    quorum(&temp_dir)
        .args(["derive", "--threshold", "2", "--signer", ALICE, BOB, DAVE, ALICE])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1DA4Q6JboQdDYUiZrmJaQF2RfyVP5xkxdVZ27HBhjPNU57h",
        ))
        .stdout(predicate::str::contains("other_signatories"));

    quorum(&temp_dir)
        .args(["derive", "-t", "2", "--format", "42", ALICE, BOB, DAVE])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "5CGrv4qEk299n1UCcDiJSFQsa3yqgnQct8m4rpHq9eMrHrfd",
        ));
}

#[test]
fn test_derive_rejects_bad_threshold() {
    let temp_dir = TempDir::new().unwrap();
    quorum(&temp_dir)
        .args(["derive", "--threshold", "4", ALICE, BOB, DAVE])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid threshold"));

    quorum(&temp_dir)
        .args(["derive", "--threshold", "2", ALICE, ALICE, BOB])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate signatory"));
}

#[test]
fn test_call_encodes_transfer() {
    let temp_dir = TempDir::new().unwrap();
    quorum(&temp_dir)
        .args(["call", "--dest", EVE, "--amount", "10000000000000", "--keep-alive"])
        .assert()
        .success()
        .stdout(predicate::str::contains(TRANSFER_CALL))
        .stdout(predicate::str::contains(TRANSFER_HASH));
}

#[test]
fn test_decode_call() {
    let temp_dir = TempDir::new().unwrap();
    quorum(&temp_dir)
        .args(["decode", "call", TRANSFER_CALL])
        .assert()
        .success()
        .stdout(predicate::str::contains("transfer_keep_alive"))
        .stdout(predicate::str::contains("balances"));

    quorum(&temp_dir)
        .args(["decode", "call", "0x0503"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("truncated input"));

    quorum(&temp_dir)
        .args(["decode", "call", "0x6300"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("schema mismatch"));
}

#[test]
fn test_tx_hash() {
    let temp_dir = TempDir::new().unwrap();
    quorum(&temp_dir)
        .args(["tx-hash", "0x"])
        .assert()
        .failure();

    quorum(&temp_dir)
        .args(["tx-hash", "0c040500"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0x"));
}

#[test]
fn test_sign_then_decode() {
    let temp_dir = TempDir::new().unwrap();
    let key = PrivateKey::from_seed(KeyScheme::Ed25519, &[7; 32]).unwrap();
    let signer = key.public_key().to_ss58(0);
    let signatories = format!("{signer},{BOB},{DAVE}");
    let genesis = format!("0x{}", "91".repeat(32));
    let block = format!("0x{}", "bb".repeat(32));

    let output = quorum(&temp_dir)
        .args(["sign", "--seed", &"07".repeat(32), "--threshold", "2"])
        .args(["--signatories", &signatories])
        .args(["--dest", EVE, "--amount", "1000", "--keep-alive"])
        .args(["--nonce", "5", "--spec-version", "9430", "--tx-version", "24"])
        .args(["--genesis-hash", &genesis, "--block-hash", &block])
        .args(["--block-number", "1200"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let signed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(signed["signer"], signer.as_str());
    let extrinsic = signed["extrinsic"].as_str().unwrap().to_string();
    let tx_hash = signed["tx_hash"].as_str().unwrap().to_string();

    quorum(&temp_dir)
        .args(["decode", "extrinsic", &extrinsic])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"signed\": true"))
        .stdout(predicate::str::contains("as_multi"))
        .stdout(predicate::str::contains("\"nonce\": 5"))
        .stdout(predicate::str::contains(signer.as_str()));

    quorum(&temp_dir)
        .args(["tx-hash", &extrinsic])
        .assert()
        .success()
        .stdout(predicate::str::contains(tx_hash));
}

#[test]
fn test_sign_rejects_outsider() {
    let temp_dir = TempDir::new().unwrap();
    quorum(&temp_dir)
        .args(["sign", "--seed", &"07".repeat(32), "--threshold", "2"])
        .args(["--signatories", &format!("{ALICE},{BOB},{DAVE}")])
        .args(["--dest", EVE, "--amount", "1000"])
        .args(["--nonce", "0", "--spec-version", "1", "--tx-version", "1"])
        .args(["--genesis-hash", &format!("0x{}", "91".repeat(32)), "--immortal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown signer"));
}

#[test]
fn test_config_set_and_show() {
    let temp_dir = TempDir::new().unwrap();
    quorum(&temp_dir)
        .args(["config", "set", "chain.ss58_format", "42"])
        .assert()
        .success();
    assert!(temp_dir.path().join("config.toml").exists());

    quorum(&temp_dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ss58_format = 42"));

    quorum(&temp_dir)
        .args(["config", "set", "chain.era_period", "3"])
        .assert()
        .failure();
}

#[test]
fn test_config_validate_missing_file() {
    let mut cmd = Command::cargo_bin("quorum").unwrap();
    cmd.arg("config")
        .arg("validate")
        .arg("non_existent_config.toml")
        .assert()
        .failure();
}

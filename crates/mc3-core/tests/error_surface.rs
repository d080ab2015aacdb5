use mc3_core::errors::{ErrorInfo, Mc3Error};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("chain", "1")
        .with_context("worker", "0")
}

#[test]
fn config_error_surface() {
    let err = Mc3Error::Config(sample_info("heats-length", "heat list too short"));
    assert_eq!(err.info().code, "heats-length");
    assert!(err.info().context.contains_key("chain"));
}

#[test]
fn chain_error_surface() {
    let err = Mc3Error::Chain(sample_info("advance-failed", "proposal not computable"));
    assert_eq!(err.info().code, "advance-failed");
    assert!(err.info().context.contains_key("worker"));
}

#[test]
fn sync_error_surface() {
    let err = Mc3Error::Sync(sample_info("gather-duplicate", "slot reported twice"));
    assert_eq!(err.info().code, "gather-duplicate");
}

#[test]
fn tuning_error_surface() {
    let err = Mc3Error::Tuning(sample_info("move-name", "move lists disagree"));
    assert_eq!(err.info().code, "move-name");
}

#[test]
fn rng_error_surface() {
    let err = Mc3Error::Rng(sample_info("bad-substream", "invalid substream id"));
    assert_eq!(err.info().code, "bad-substream");
}

#[test]
fn serde_error_surface() {
    let err = Mc3Error::Serde(sample_info("checkpoint-parse", "unexpected token"));
    assert_eq!(err.info().code, "checkpoint-parse");
}

#[test]
fn display_carries_context_and_hint() {
    let err = Mc3Error::Sync(
        ErrorInfo::new("gather-missing", "no value for slot")
            .with_context("slot", "3")
            .with_hint("check the worker partition"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("sync error:"));
    assert!(rendered.contains("slot=3"));
    assert!(rendered.contains("hint: check the worker partition"));
}

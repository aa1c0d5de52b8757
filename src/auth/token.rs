use rand::{Rng, distr::Alphanumeric};

const VERIFICATION_CODE_LEN: usize = 12;
const TX_REF_SUFFIX_LEN: usize = 10;

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Public certificate verification code, e.g. `LHC-7QK2M9XZ4B1D`.
pub fn generate_verification_code() -> String {
    format!("LHC-{}", random_alphanumeric(VERIFICATION_CODE_LEN).to_uppercase())
}

/// Payment transaction reference handed to the gateway.
pub fn generate_tx_ref() -> String {
    format!(
        "learnhub-{}-{}",
        chrono::Utc::now().timestamp(),
        random_alphanumeric(TX_REF_SUFFIX_LEN)
    )
}

//! External slip-verifier boundary and the matching policy applied to its
//! output.
//!
//! The verifier is a black box: it parses a transfer receipt image and
//! returns the transfer metadata, or a structured failure. The matching
//! policy then decides whether the parsed transfer pays for the target
//! reservation. Every sub-check is computed and reported even when the
//! overall decision is lenient, so operators can audit a soft pass.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MatchingPolicy;
use crate::model::Ms;

/// Transfer metadata parsed from a slip image.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedTransfer {
    pub amount: Decimal,
    pub receiving_bank: String,
    /// Masked account number, e.g. "xxx-x-xx123-4". Only trailing digits
    /// are compared.
    pub receiver_account_masked: String,
    pub receiver_name: String,
    pub transaction_at: Ms,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerifierError {
    /// The slip image was already used for another verification.
    Duplicate,
    /// The image is not a recognizable transfer slip.
    NotASlip,
    /// Transport failure or verifier outage. Retryable.
    Transport(String),
    Other(String),
}

impl std::fmt::Display for VerifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifierError::Duplicate => write!(f, "slip already used"),
            VerifierError::NotASlip => write!(f, "not a transfer slip"),
            VerifierError::Transport(msg) => write!(f, "verifier unreachable: {msg}"),
            VerifierError::Other(msg) => write!(f, "verifier failure: {msg}"),
        }
    }
}

impl std::error::Error for VerifierError {}

#[async_trait]
pub trait SlipVerifier: Send + Sync {
    async fn verify(
        &self,
        image: &[u8],
        claimed_amount: Decimal,
    ) -> Result<VerifiedTransfer, VerifierError>;
}

/// Outcome of every sub-check, kept on the payment record for audit.
///
/// `account_ok`/`name_ok` are `None` when the corresponding expectation is
/// not configured — skipped, never silently bypassed when configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub amount_ok: bool,
    pub bank_ok: bool,
    pub account_ok: Option<bool>,
    pub name_ok: Option<bool>,
}

impl MatchReport {
    pub fn evaluate(
        transfer: &VerifiedTransfer,
        claimed_amount: Decimal,
        policy: &MatchingPolicy,
    ) -> Self {
        let amount_ok = (transfer.amount - claimed_amount).abs() <= policy.amount_epsilon;

        let bank_ok = transfer
            .receiving_bank
            .eq_ignore_ascii_case(&policy.expected_bank);

        let account_ok = policy.expected_account_last4.as_deref().map(|last4| {
            let digits: String = transfer
                .receiver_account_masked
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            digits.ends_with(last4)
        });

        let name_ok = if policy.holder_aliases.is_empty() {
            None
        } else {
            let holder = transfer.receiver_name.to_lowercase();
            Some(
                policy
                    .holder_aliases
                    .iter()
                    .any(|alias| holder.contains(&alias.to_lowercase())),
            )
        };

        Self {
            amount_ok,
            bank_ok,
            account_ok,
            name_ok,
        }
    }

    /// The confirmation decision. Name matching only gates confirmation in
    /// strict mode; the lenient default still records the result.
    pub fn passes(&self, strict_name_match: bool) -> bool {
        self.amount_ok
            && self.bank_ok
            && self.account_ok.unwrap_or(true)
            && (!strict_name_match || self.name_ok.unwrap_or(true))
    }
}

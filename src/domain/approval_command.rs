//! Extraction of `ok <id>` approval commands from free-text replies.

use std::sync::LazyLock;

use regex::Regex;

use super::VerificationId;

/// ASCII case-insensitive `ok` at an ASCII word boundary, whitespace, then
/// an ASCII alphanumeric run.
static APPROVAL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i-u:\bok)\s+([A-Za-z0-9]+)").ok());

/// An approval instruction found in an administrator's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalCommand {
    /// Verification the administrator approved.
    pub verification_id: VerificationId,
}

impl ApprovalCommand {
    /// Returns the first `ok <id>` command in `message`, ignoring any text
    /// around it. Returns `None` if the message holds no such command.
    #[must_use]
    pub fn parse(message: &str) -> Option<Self> {
        let pattern = APPROVAL_PATTERN.as_ref()?;
        let id = pattern.captures(message)?.get(1)?.as_str();
        let verification_id = VerificationId::parse(id).ok()?;
        Some(Self { verification_id })
    }
}

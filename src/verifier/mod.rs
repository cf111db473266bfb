//! Verifier capability consumed by the ledger.
//!
//! The verifier is an external trust anchor: given an attestation and the
//! context it covers, it accepts or rejects. The ledger injects exactly one
//! implementation at construction and never rebinds it, so the fail-closed
//! guarantee cannot be weakened at runtime.
//!
//! The ledger treats any non-`Ok(true)` outcome as rejection. A timeout or
//! transport failure inside an implementation must surface as
//! [`VerifierError`], never as implicit approval.

use thiserror::Error;

use crate::circle::types::{Address, Attestation, CircleId};

/// Failure inside a verifier implementation.
///
/// The ledger maps this to a rejection; it exists so implementations can
/// report *why* verification could not complete.
#[derive(Error, Debug)]
#[error("Verifier failure: {0}")]
pub struct VerifierError(pub String);

/// What an attestation must cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyContext {
    /// Circle the privileged action targets.
    pub circle_id: CircleId,
    /// Member performing the action.
    pub author: Address,
}

/// External trust anchor that accepts or rejects attestations.
///
/// Implementations must be bounded in time; the ledger treats an error as a
/// rejection, so a hung verifier should fail with [`VerifierError`] rather
/// than block the commit path indefinitely.
pub trait AttestationVerifier: Send + Sync {
    /// Checks an attestation against the given context.
    ///
    /// Returns `Ok(true)` to accept, `Ok(false)` to reject.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError`] when verification cannot complete; the
    /// ledger treats this the same as a rejection.
    fn verify(
        &self,
        attestation: &Attestation,
        context: &VerifyContext,
    ) -> Result<bool, VerifierError>;
}

/// Verifier with a fixed answer. Test use only.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Copy)]
pub struct StaticVerifier {
    accept: bool,
}

#[cfg(any(test, feature = "test-utils"))]
impl StaticVerifier {
    /// Verifier that accepts every attestation.
    #[must_use]
    pub const fn accept() -> Self {
        Self { accept: true }
    }

    /// Verifier that rejects every attestation.
    #[must_use]
    pub const fn reject() -> Self {
        Self { accept: false }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl AttestationVerifier for StaticVerifier {
    fn verify(
        &self,
        _attestation: &Attestation,
        _context: &VerifyContext,
    ) -> Result<bool, VerifierError> {
        Ok(self.accept)
    }
}

/// Verifier that always fails, for exercising the fail-closed path.
/// Test use only.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Copy)]
pub struct ErroringVerifier;

#[cfg(any(test, feature = "test-utils"))]
impl AttestationVerifier for ErroringVerifier {
    fn verify(
        &self,
        _attestation: &Attestation,
        _context: &VerifyContext,
    ) -> Result<bool, VerifierError> {
        Err(VerifierError("verifier unreachable".to_string()))
    }
}

//! The two ledger workflows. Both are driven by `SessionController`, which owns the
//! session-scoped caches they update.

pub mod registration;
pub mod verification;

pub use registration::{
    RegistrationPhase, RegistrationRequest, RegistrationSuccess, RegistrationWorkflow,
};
pub use verification::{Verdict, VerificationPhase, VerificationResult, VerificationWorkflow};

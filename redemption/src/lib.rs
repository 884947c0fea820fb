//! Membership redemption protocol.
//!
//! A business terminal redeems a benefit in two phases:
//! 1. **Verify**: decode the scanned code, validate the membership, pick an
//!    eligible benefit and check the duplicate window. Nothing is written.
//! 2. **Commit**: after the operator confirms, record the redemption with a
//!    single conditional insert so concurrent terminals can never both
//!    redeem for the same member at the same business inside the window.
//!
//! [`RedemptionOrchestrator`] drives one terminal through these phases as an
//! explicit state machine; the components it composes are usable alone.

pub mod error;
pub mod guard;
pub mod matcher;
pub mod orchestrator;
pub mod registry;
pub mod state;
pub mod validator;

pub use error::{
    CommitError, DecodeError, DuplicateError, MatchError, OrchestratorError, RegistryError,
    RejectReason, ValidationError,
};
pub use guard::RedemptionGuard;
pub use matcher::{select_benefit, BenefitMatcher, NonEmpty};
pub use orchestrator::{
    RedemptionEvent, RedemptionOrchestrator, RedemptionResult, Stores, VerificationResult,
};
pub use registry::{lock_terminal, TerminalHandle, TerminalRegistry};
pub use state::{CancelCause, OrchestratorState, PendingRedemption};
pub use validator::MembershipValidator;

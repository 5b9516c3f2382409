//! Mapping of helper responses to outcomes.
use custodia_types::Operation;
use custodia_wire::ResultStatus;

/// Outcome of a response for the link that sent the request.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResponseOutcome {
    /// Positive outcome for the operation.
    Accept,
    /// Helper declined a pairing.
    Refuse,
    /// Negative application level result.
    Fail,
    /// Helper no longer takes part in the pairing.
    Disconnect,
}

/// Response handling policy keyed by operation.
pub struct ResponsePolicy;

impl ResponsePolicy {
    /// Outcome of a result status for an operation.
    pub const fn outcome(
        operation: Operation,
        status: ResultStatus,
    ) -> ResponseOutcome {
        use ResponseOutcome::*;
        match (operation, status) {
            (_, ResultStatus::Ok) => Accept,

            (Operation::Pair, ResultStatus::Refused) => Refuse,
            (Operation::Pair, ResultStatus::Gone) => Disconnect,
            (Operation::Pair, _) => Fail,

            // Nothing left to remove at the helper
            (Operation::Unpair, ResultStatus::NotFound) => Accept,
            (Operation::Unpair, ResultStatus::Gone) => Accept,
            (Operation::Unpair, _) => Fail,

            (Operation::Store, ResultStatus::Gone) => Disconnect,
            (Operation::Store, _) => Fail,

            (Operation::Verify, ResultStatus::Gone) => Disconnect,
            (Operation::Verify, _) => Fail,

            (Operation::Retrieve, ResultStatus::Gone) => Disconnect,
            (Operation::Retrieve, _) => Fail,
        }
    }
}

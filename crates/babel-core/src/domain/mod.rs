//! Domain model: assignment record, lifecycle, exchange rows, errors.

pub mod assignment;
pub mod context;
pub mod errors;
pub mod events;
pub mod exchange;
pub mod ids;
pub mod state;
pub mod transition;

pub use assignment::{
    ActiveKey, Assignment, AssignmentDraft, AssignmentType, Priority, RefreshFields,
};
pub use context::{Principal, RequestContext};
pub use errors::{
    CoreError, ErrorBody, ErrorEnvelope, StoreError, ValidationFailure, Violation,
};
pub use events::ActivityRecord;
pub use exchange::{
    ConflictSummary, ConflictType, ExchangeFormat, ExchangeJob, ExchangeOptions, ExchangeReport,
    ExchangeRow, ExchangeSummary, JobKind, JobProgress, JobStatus, RowConflict, RowFailure,
    RowResult, RowStatus,
};
pub use ids::{AssignmentId, ExchangeJobId};
pub use state::AssignmentStatus;
pub use transition::{
    TransitionAction, TransitionError, TransitionPayload, apply_transition, truncate_to_bytes,
};

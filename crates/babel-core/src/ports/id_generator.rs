//! IdGenerator port.
//!
//! ULIDs take their timestamp from the injected [`Clock`], so ids generated
//! under a `FixedClock` share a deterministic time prefix.

use crate::domain::ids::{AssignmentId, ExchangeJobId};
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_assignment_id(&self) -> AssignmentId;

    fn generate_job_id(&self) -> ExchangeJobId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_assignment_id(&self) -> AssignmentId {
        AssignmentId::from(self.next_ulid())
    }

    fn generate_job_id(&self) -> ExchangeJobId {
        ExchangeJobId::from(self.next_ulid())
    }
}

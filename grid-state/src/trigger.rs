use uuid::Uuid;

/// Hook the State Service uses to kick off the Edge-Update Job after a
/// successful `UpdateStateContent` commit, without depending on the job's
/// crate directly (the job depends on this one, not the other way around).
///
/// `trigger` is fire-and-forget: implementations should enqueue or spawn and
/// return immediately. A write must never fail, block, or retry because the
/// edge update could not be scheduled.
pub trait EdgeUpdateTrigger: Send + Sync {
    fn trigger(&self, producer_guid: Uuid);
}

/// A trigger that does nothing — used in tests and anywhere edge-derived
/// status isn't wired up.
pub struct NoopEdgeUpdateTrigger;

impl EdgeUpdateTrigger for NoopEdgeUpdateTrigger {
    fn trigger(&self, _producer_guid: Uuid) {}
}

use as_any::AsAny;
use mlo_core::{MloEntity, SimTime};
use mlo_saps::SapMsg;

use crate::MessageQueue;

/// Trait for stack entities
/// Used by MessageRouter for passing messages between entities
pub trait MloEntityTrait: Send + AsAny {
    /// Returns the entity identifier used for routing
    fn entity(&self) -> MloEntity;

    /// Handle incoming SAP primitive
    fn rx_prim(&mut self, queue: &mut MessageQueue, message: SapMsg);

    /// Called at the start of each tick
    fn tick_start(&mut self, _queue: &mut MessageQueue, _ts: SimTime) {}

    /// Called at the end of each tick. Returns true if the entity produced
    /// work during this call.
    fn tick_end(&mut self, _queue: &mut MessageQueue, _ts: SimTime) -> bool {
        false
    }
}

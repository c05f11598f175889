use mlo_core::MloEntity;
use mlo_entities::{MessageQueue, MloEntityTrait};
use mlo_saps::SapMsg;

/// A sink entity for testing purposes
/// Collects all received SapMsg messages for later inspection
pub struct Sink {
    component: MloEntity,
    msgqueue: Vec<SapMsg>,
}

impl Sink {
    pub fn new(component: MloEntity) -> Self {
        Self { component, msgqueue: vec![] }
    }

    pub fn take_msgqueue(&mut self) -> Vec<SapMsg> {
        std::mem::take(&mut self.msgqueue)
    }
}

impl MloEntityTrait for Sink {
    fn entity(&self) -> MloEntity {
        self.component
    }

    fn rx_prim(&mut self, _queue: &mut MessageQueue, message: SapMsg) {
        tracing::debug!("sink got: {}", message.msg);
        self.msgqueue.push(message);
    }
}

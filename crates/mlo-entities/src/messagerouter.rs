use std::collections::{HashMap, VecDeque};

use mlo_core::{MloEntity, SimTime};
use mlo_saps::SapMsg;

use crate::MloEntityTrait;

pub struct MessageQueue {
    messages: VecDeque<SapMsg>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self { messages: VecDeque::new() }
    }

    pub fn push_back(&mut self, message: SapMsg) {
        self.messages.push_back(message);
    }

    pub fn pop_front(&mut self) -> Option<SapMsg> {
        self.messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes SAP messages between registered entities and drives the discrete
/// tick clock. Single logical thread of control: every cross-entity effect
/// travels through the queue, nothing blocks.
pub struct MessageRouter {
    entities: HashMap<MloEntity, Box<dyn MloEntityTrait>>,
    /// Registration order, used for deterministic tick scheduling
    entity_order: Vec<MloEntity>,
    msg_queue: MessageQueue,

    /// The current virtual time, incremented each tick
    ts: SimTime,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            entity_order: Vec::new(),
            msg_queue: MessageQueue::new(),
            ts: SimTime::default(),
        }
    }

    pub fn now(&self) -> SimTime {
        self.ts
    }

    pub fn register_entity(&mut self, entity: Box<dyn MloEntityTrait>) {
        let comp_type = entity.entity();
        tracing::debug!("register_entity {:?}", comp_type);
        assert!(!self.entities.contains_key(&comp_type), "entity registered twice: {:?}", comp_type);
        self.entity_order.push(comp_type);
        self.entities.insert(comp_type, entity);
    }

    /// Returns a mut ref to a component of the requested type
    pub fn get_entity(&mut self, comp: MloEntity) -> Option<&mut dyn MloEntityTrait> {
        self.entities.get_mut(&comp).map(|entity| entity.as_mut())
    }

    pub fn submit_message(&mut self, message: SapMsg) {
        tracing::debug!(
            "submit_message {:?}: {:?} -> {:?}",
            message.get_sap(),
            message.get_source(),
            message.get_dest()
        );
        self.msg_queue.push_back(message);
    }

    pub fn deliver_message(&mut self) {
        let message = self.msg_queue.pop_front();
        if let Some(message) = message {
            tracing::trace!(
                "deliver_message: got {:?}: {:?} -> {:?}",
                message.get_sap(),
                message.get_source(),
                message.get_dest()
            );

            let dest = message.get_dest();
            if let Some(entity) = self.entities.get_mut(dest) {
                entity.rx_prim(&mut self.msg_queue, message);
            } else {
                tracing::warn!(
                    "deliver_message: entity {:?} not found for {:?}: {:?} -> {:?}",
                    dest,
                    message.get_sap(),
                    message.get_source(),
                    message.get_dest()
                );
            }
        }
    }

    pub fn deliver_all_messages(&mut self) {
        while !self.msg_queue.is_empty() {
            self.deliver_message();
        }
    }

    pub fn get_msgqueue_len(&self) -> usize {
        self.msg_queue.len()
    }

    pub fn tick_start(&mut self) {
        tracing::debug!("--- tick {} ----------------------------", self.ts);

        for comp in self.entity_order.clone() {
            if let Some(entity) = self.entities.get_mut(&comp) {
                entity.tick_start(&mut self.msg_queue, self.ts);
            }
        }
    }

    /// Executes all end-of-tick functions in registration order, delivering
    /// the resulting messages after each entity so that frames produced by
    /// one device reach the others within the same tick.
    pub fn tick_end(&mut self) {
        tracing::trace!("######################## end-of-tick ########################");

        for comp in self.entity_order.clone() {
            if let Some(entity) = self.entities.get_mut(&comp) {
                entity.tick_end(&mut self.msg_queue, self.ts);
            }
            self.deliver_all_messages();
        }

        self.ts = self.ts.add_ticks(1);
    }

    /// Runs the full stack either forever or for a specified number of ticks.
    pub fn run_stack(&mut self, num_ticks: Option<usize>) {
        let mut ticks: usize = 0;

        loop {
            self.tick_start();

            while self.get_msgqueue_len() > 0 {
                self.deliver_all_messages();
            }

            self.tick_end();

            ticks += 1;
            if let Some(num_ticks) = num_ticks {
                if ticks >= num_ticks {
                    break;
                }
            }
        }
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

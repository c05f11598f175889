/// Entities addressable by the message router
#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy)]
pub enum MloEntity {
    /// The AP-side MLD
    Ap,
    /// A non-AP MLD, by station index
    Sta(u8),
    /// Shared-medium stand-in forwarding PPDUs between devices
    Medium,
    /// The surrounding harness: traffic source/sink and test observer
    Harness,
}

use bitflags::bitflags;

bitflags! {
    /// Per-packet delivery hints carried in the header `flags` field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        /// Payload may be dropped by the peer; the next one supersedes it.
        const NON_CRITICAL = 0x1;
    }
}

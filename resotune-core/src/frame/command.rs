/// The 32-bit command word leading every frame.
///
/// The lower 31 bits hold the command id and the top bit marks a write.
#[bitfield_struct::bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct CommandWord {
    /// Command id.
    #[bits(31)]
    pub id: u32,
    /// Set for write commands.
    pub write: bool,
}

impl CommandWord {
    /// The largest command id that fits in the word.
    pub const MAX_ID: u32 = 0x7FFF_FFFF;

    /// Creates a read command word.
    #[must_use]
    pub const fn for_read(id: u32) -> Self {
        Self::new().with_id(id & Self::MAX_ID)
    }

    /// Creates a write command word.
    #[must_use]
    pub const fn for_write(id: u32) -> Self {
        Self::for_read(id).with_write(true)
    }
}

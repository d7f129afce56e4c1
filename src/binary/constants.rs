pub mod v1_0 {
    /// The Binary Version Marker that identifies a stream of binary Ion 1.0 values.
    pub const IVM: [u8; 4] = [0xE0, 0x01, 0x00, 0xEA];

    /// The maximum length that can be stored directly in a type descriptor's length nibble.
    /// Greater lengths follow the descriptor as a VarUInt.
    pub const MAX_INLINE_LENGTH: usize = 13;

    pub mod length_codes {
        /// Indicates that the value's length follows the descriptor byte as a VarUInt.
        pub const VAR_UINT: u8 = 14;
        /// Indicates that the value is a null of its descriptor's type.
        pub const NULL: u8 = 15;
    }
}

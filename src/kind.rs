/// Encoding strategies a stream can be produced with
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EncoderKind {
    PrefixBitmask = 0x01,
}

impl EncoderKind {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0x01 => Some(EncoderKind::PrefixBitmask),
            _ => None,
        }
    }
}

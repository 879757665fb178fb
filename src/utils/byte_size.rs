use std::fmt;

/// Byte count rendered with binary units, as size limits are configured.
///
/// Exact multiples print without decimals (`10 MiB`), anything else with one
/// (`1.5 KiB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const KIB: u64 = 1024;
    pub const MIB: u64 = 1024 * Self::KIB;
    pub const GIB: u64 = 1024 * Self::MIB;

    pub fn mib(n: u64) -> Self {
        ByteSize(n * Self::MIB)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (unit, name) = match self.0 {
            n if n >= Self::GIB => (Self::GIB, "GiB"),
            n if n >= Self::MIB => (Self::MIB, "MiB"),
            n if n >= Self::KIB => (Self::KIB, "KiB"),
            n => return write!(f, "{} B", n),
        };

        if self.0 % unit == 0 {
            write!(f, "{} {}", self.0 / unit, name)
        } else {
            write!(f, "{:.1} {}", self.0 as f64 / unit as f64, name)
        }
    }
}

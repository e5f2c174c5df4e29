use serde::{Deserialize, Serialize};
use std::fmt;

/// Lattice coordinate of a dangling-bond site.
///
/// `x` counts lattice columns, `y` counts dimer rows and `z` selects the
/// position inside a dimer (`0` or `1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteCoord {
    pub x: i64,
    pub y: i64,
    #[serde(default)]
    pub z: u8,
}

impl SiteCoord {
    pub const fn new(x: i64, y: i64, z: u8) -> Self {
        Self { x, y, z }
    }
}

impl From<(i64, i64, u8)> for SiteCoord {
    fn from((x, y, z): (i64, i64, u8)) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for SiteCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

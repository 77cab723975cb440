/// Visual family of an entity.
///
/// The discriminant is written verbatim into `InstanceRecord::kind` and is
/// part of the rasterizer contract; never reorder.
#[repr(i32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VisualType {
    Rock = 0,
    Ice = 1,
    Lava = 2,
    Gas = 3,
    Star = 4,
    BlackHole = 5,
    Trail = 6,
    Jet = 7,
    Neutron = 8,
}

impl VisualType {
    pub const COUNT: usize = 9;

    pub const ALL: [VisualType; Self::COUNT] = [
        VisualType::Rock,
        VisualType::Ice,
        VisualType::Lava,
        VisualType::Gas,
        VisualType::Star,
        VisualType::BlackHole,
        VisualType::Trail,
        VisualType::Jet,
        VisualType::Neutron,
    ];

    /// Value written to the instance buffer.
    #[inline]
    pub const fn wire(self) -> i32 {
        self as i32
    }

    #[inline]
    pub fn from_wire(v: i32) -> Option<Self> {
        usize::try_from(v).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Row in per-type parameter tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Solid bodies take part in body-body collisions.
    ///
    /// Effects (trails, jets) pass through everything and black holes are
    /// handled by consumption instead.
    #[inline]
    pub const fn is_solid(self) -> bool {
        !matches!(self, VisualType::BlackHole | VisualType::Trail | VisualType::Jet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_are_stable() {
        assert_eq!(VisualType::Rock.wire(), 0);
        assert_eq!(VisualType::BlackHole.wire(), 5);
        assert_eq!(VisualType::Neutron.wire(), 8);
    }

    #[test]
    fn from_wire_inverts_wire() {
        for t in VisualType::ALL {
            assert_eq!(VisualType::from_wire(t.wire()), Some(t));
        }
        assert_eq!(VisualType::from_wire(-1), None);
        assert_eq!(VisualType::from_wire(9), None);
    }

    #[test]
    fn index_matches_table_order() {
        for (i, t) in VisualType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }
}

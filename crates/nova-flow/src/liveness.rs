/// Reachability of a program point.
///
/// `Recovery` marks a point that was found unreachable and reported; it is
/// treated as reachable afterwards so a single dead statement does not
/// produce a cascade of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Liveness {
    Alive,
    Dead,
    Recovery,
}

impl Liveness {
    /// Join of two incoming paths.
    #[must_use]
    pub fn or(self, other: Liveness) -> Liveness {
        match self {
            Liveness::Alive => Liveness::Alive,
            Liveness::Dead => other,
            Liveness::Recovery => match other {
                Liveness::Alive => Liveness::Alive,
                Liveness::Dead | Liveness::Recovery => Liveness::Recovery,
            },
        }
    }

    /// Both conditions must hold.
    #[must_use]
    pub fn and(self, other: Liveness) -> Liveness {
        match self {
            Liveness::Alive => other,
            Liveness::Dead => Liveness::Dead,
            Liveness::Recovery => match other {
                Liveness::Dead => Liveness::Dead,
                Liveness::Alive | Liveness::Recovery => Liveness::Recovery,
            },
        }
    }

    #[must_use]
    pub fn from(alive: bool) -> Liveness {
        if alive {
            Liveness::Alive
        } else {
            Liveness::Dead
        }
    }
}

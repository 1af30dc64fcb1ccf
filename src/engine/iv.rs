//! Individual values and the full 16×16×16 IV domain.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest value a single IV can take.
pub const IV_MAX: u8 = 15;

/// Number of distinct IV triples.
pub const IV_DOMAIN_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IvTriple {
    pub attack: u8,
    pub defense: u8,
    pub stamina: u8,
}

impl IvTriple {
    /// Returns None when any component is above [IV_MAX].
    pub fn new(attack: u8, defense: u8, stamina: u8) -> Option<Self> {
        let iv = Self {
            attack,
            defense,
            stamina,
        };
        iv.is_valid().then_some(iv)
    }

    /// 15/15/15.
    pub const fn perfect() -> Self {
        Self {
            attack: IV_MAX,
            defense: IV_MAX,
            stamina: IV_MAX,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.attack <= IV_MAX && self.defense <= IV_MAX && self.stamina <= IV_MAX
    }

    /// Position of this triple in [iv_domain] order.
    pub fn domain_index(&self) -> usize {
        let width = IV_MAX as usize + 1;
        (self.attack as usize * width + self.defense as usize) * width + self.stamina as usize
    }
}

impl fmt::Display for IvTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.attack, self.defense, self.stamina)
    }
}

/// Every IV triple, attack-major then defense then stamina. The order is stable
/// across runs; ranking never depends on it except as the final tie order.
pub fn iv_domain() -> impl Iterator<Item = IvTriple> {
    (0..=IV_MAX).flat_map(|attack| {
        (0..=IV_MAX).flat_map(move |defense| {
            (0..=IV_MAX).map(move |stamina| IvTriple {
                attack,
                defense,
                stamina,
            })
        })
    })
}

/// Materialized [iv_domain], built once per run and shared by every unit.
pub fn iv_domain_vec() -> Vec<IvTriple> {
    let mut domain = Vec::with_capacity(IV_DOMAIN_SIZE);
    domain.extend(iv_domain());
    domain
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn domain_is_exhaustive_and_distinct() {
        let domain = iv_domain_vec();
        assert_eq!(domain.len(), IV_DOMAIN_SIZE);
        let unique: HashSet<_> = domain.iter().copied().collect();
        assert_eq!(unique.len(), IV_DOMAIN_SIZE);
        assert!(domain.iter().all(IvTriple::is_valid));
    }

    #[test]
    fn domain_order_is_attack_major() {
        let domain = iv_domain_vec();
        assert_eq!(domain[0], IvTriple::new(0, 0, 0).unwrap());
        assert_eq!(domain[1], IvTriple::new(0, 0, 1).unwrap());
        assert_eq!(domain[16], IvTriple::new(0, 1, 0).unwrap());
        assert_eq!(domain[IV_DOMAIN_SIZE - 1], IvTriple::perfect());
        for (position, iv) in domain.iter().enumerate() {
            assert_eq!(iv.domain_index(), position);
        }
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert!(IvTriple::new(16, 0, 0).is_none());
        assert!(IvTriple::new(0, 0, 255).is_none());
        assert_eq!(IvTriple::perfect().to_string(), "15/15/15");
    }
}

//! Approval tier resolution
//!
//! Maps a claim's estimated cost and priority onto the approval levels it
//! needs. The mapping is monotonic: raising cost or priority never removes a
//! level.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::claim::{Claim, Priority};
use crate::config::TierThresholds;
use crate::transitions::Role;

/// One tier of the approval chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ApprovalLevel {
    Technician = 1,
    Supervisor = 2,
    Manager = 3,
    Director = 4,
}

impl ApprovalLevel {
    pub const ALL: [ApprovalLevel; 4] = [
        ApprovalLevel::Technician,
        ApprovalLevel::Supervisor,
        ApprovalLevel::Manager,
        ApprovalLevel::Director,
    ];

    /// Numeric level, 1 being the lowest
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        ApprovalLevel::ALL.into_iter().find(|level| level.rank() == rank)
    }

    /// Role a user must hold to decide at this level
    pub fn role(&self) -> Role {
        match self {
            ApprovalLevel::Technician => Role::Technician,
            ApprovalLevel::Supervisor => Role::Supervisor,
            ApprovalLevel::Manager => Role::Manager,
            ApprovalLevel::Director => Role::Director,
        }
    }

    /// The level above, if any
    pub fn next(&self) -> Option<Self> {
        Self::from_rank(self.rank() + 1)
    }
}

impl fmt::Display for ApprovalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.role())
    }
}

impl From<ApprovalLevel> for u8 {
    fn from(level: ApprovalLevel) -> u8 {
        level.rank()
    }
}

impl TryFrom<u8> for ApprovalLevel {
    type Error = String;

    fn try_from(rank: u8) -> Result<Self, Self::Error> {
        ApprovalLevel::from_rank(rank).ok_or_else(|| format!("Invalid approval level: {}", rank))
    }
}

/// Computes required approval levels
#[derive(Debug, Clone, Default)]
pub struct TierResolver {
    thresholds: TierThresholds,
}

impl TierResolver {
    pub fn new(thresholds: TierThresholds) -> Self {
        Self { thresholds }
    }

    /// Levels required for a claim with the given cost and priority
    ///
    /// - Technician: always
    /// - Supervisor: priority above low, or cost above the supervisor threshold
    /// - Manager: priority high or critical, or cost above the manager threshold
    /// - Director: priority critical, or cost above the director threshold
    pub fn required_levels(&self, estimated_cost: Decimal, priority: Priority) -> BTreeSet<ApprovalLevel> {
        let t = &self.thresholds;
        let mut levels = BTreeSet::from([ApprovalLevel::Technician]);

        if priority != Priority::Low || estimated_cost > t.supervisor_cost {
            levels.insert(ApprovalLevel::Supervisor);
        }
        if priority >= Priority::High || estimated_cost > t.manager_cost {
            levels.insert(ApprovalLevel::Manager);
        }
        if priority == Priority::Critical || estimated_cost > t.director_cost {
            levels.insert(ApprovalLevel::Director);
        }
        levels
    }

    pub fn for_claim(&self, claim: &Claim) -> BTreeSet<ApprovalLevel> {
        self.required_levels(claim.estimated_cost, claim.priority)
    }
}

/// Lowest required level strictly above `current`
pub fn next_required_level(
    required: &BTreeSet<ApprovalLevel>,
    current: ApprovalLevel,
) -> Option<ApprovalLevel> {
    required.iter().copied().find(|level| *level > current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use ApprovalLevel::*;

    fn levels(cost: Decimal, priority: Priority) -> Vec<ApprovalLevel> {
        TierResolver::default().required_levels(cost, priority).into_iter().collect()
    }

    #[test]
    fn test_low_cost_low_priority_needs_technician_only() {
        assert_eq!(levels(dec!(600), Priority::Low), vec![Technician]);
    }

    #[test]
    fn test_high_priority_mid_cost() {
        assert_eq!(levels(dec!(8000), Priority::High), vec![Technician, Supervisor, Manager]);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        assert_eq!(levels(dec!(1000), Priority::Low), vec![Technician]);
        assert_eq!(levels(dec!(1000.01), Priority::Low), vec![Technician, Supervisor]);
        assert_eq!(levels(dec!(5000), Priority::Low), vec![Technician, Supervisor]);
        assert_eq!(levels(dec!(20000.01), Priority::Low), ApprovalLevel::ALL.to_vec());
    }

    #[test]
    fn test_critical_always_reaches_director() {
        assert_eq!(levels(dec!(0), Priority::Critical), ApprovalLevel::ALL.to_vec());
    }

    #[test]
    fn test_level_navigation() {
        assert_eq!(Technician.next(), Some(Supervisor));
        assert_eq!(Director.next(), None);
        assert_eq!(Manager.role(), Role::Manager);
        assert_eq!(ApprovalLevel::try_from(5u8).ok(), None);

        let required = BTreeSet::from([Technician, Supervisor, Manager]);
        assert_eq!(next_required_level(&required, Technician), Some(Supervisor));
        assert_eq!(next_required_level(&required, Manager), None);
        assert_eq!(next_required_level(&required, Director), None);
    }

    #[test]
    fn test_serializes_as_rank() {
        assert_eq!(serde_json::to_string(&Manager).unwrap(), "3");
        assert_eq!(serde_json::from_str::<ApprovalLevel>("2").unwrap(), Supervisor);
        assert!(serde_json::from_str::<ApprovalLevel>("9").is_err());
    }

    fn priority_strategy() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::Low),
            Just(Priority::Medium),
            Just(Priority::High),
            Just(Priority::Critical),
        ]
    }

    proptest! {
        #[test]
        fn required_levels_are_monotonic(
            cost_a in 0i64..5_000_000,
            cost_b in 0i64..5_000_000,
            priority_a in priority_strategy(),
            priority_b in priority_strategy(),
        ) {
            let resolver = TierResolver::default();
            let (hi_cost, lo_cost) = (cost_a.max(cost_b), cost_a.min(cost_b));
            let (hi_priority, lo_priority) = (priority_a.max(priority_b), priority_a.min(priority_b));

            let higher = resolver.required_levels(Decimal::new(hi_cost, 2), hi_priority);
            let lower = resolver.required_levels(Decimal::new(lo_cost, 2), lo_priority);
            prop_assert!(higher.is_superset(&lower));
        }

        #[test]
        fn required_levels_form_a_chain_from_technician(
            cents in 0i64..5_000_000,
            priority in priority_strategy(),
        ) {
            let levels: Vec<u8> = TierResolver::default()
                .required_levels(Decimal::new(cents, 2), priority)
                .into_iter()
                .map(|level| level.rank())
                .collect();
            let expected: Vec<u8> = (1..=levels.len() as u8).collect();
            prop_assert_eq!(levels, expected);
        }
    }
}

//! Tests for the typed identifiers

use std::collections::HashSet;

use core_kernel::{ApprovalId, ClaimId, CustomerId, StatusChangeId, UserId, VehicleId};
use proptest::prelude::*;
use uuid::Uuid;

mod claim_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let ids: HashSet<ClaimId> = (0..100).map(|_| ClaimId::new()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = ClaimId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ClaimId::new_v7();
        assert!(id1 < id2);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(ClaimId::prefix(), "CLM");
    }

    #[test]
    fn test_json_serialization() {
        let id = ClaimId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: ClaimId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}

mod prefix_tests {
    use super::*;

    #[test]
    fn test_each_identifier_has_its_own_prefix() {
        let prefixes = [
            ClaimId::prefix(),
            StatusChangeId::prefix(),
            ApprovalId::prefix(),
            CustomerId::prefix(),
            VehicleId::prefix(),
            UserId::prefix(),
        ];
        let unique: HashSet<_> = prefixes.iter().collect();
        assert_eq!(unique.len(), prefixes.len());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("USR-not-a-uuid".parse::<UserId>().is_err());
        assert!("".parse::<CustomerId>().is_err());
    }
}

proptest! {
    #[test]
    fn display_then_parse_preserves_identity(bytes in any::<[u8; 16]>()) {
        let id = VehicleId::from_uuid(Uuid::from_bytes(bytes));
        let parsed: VehicleId = id.to_string().parse().unwrap();
        prop_assert_eq!(id, parsed);
    }
}

//! Integration tests for the circle ledger.
//!
//! These tests verify the behavior of the full `CircleLedger` surface:
//! - Circle lifecycle (create, snapshot, archive)
//! - Membership admission, capacity, and departure rules
//! - Activity posting, verifier gating, and member-only reads
//! - Event emission for off-core indexers

use std::sync::Arc;

use cozycircle_core::circle::{
    Address, Attestation, CircleConfig, CircleLedger, ContentRef, EventSink, LedgerError,
    LedgerEvent, MemoryEventLog,
};
use cozycircle_core::verifier::{ErroringVerifier, StaticVerifier};

fn addr(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

fn accepting_ledger() -> (CircleLedger, Arc<MemoryEventLog>) {
    let events = Arc::new(MemoryEventLog::new());
    let ledger = CircleLedger::in_memory(
        Arc::new(StaticVerifier::accept()),
        Arc::clone(&events) as Arc<dyn EventSink>,
    )
    .expect("should create ledger");
    (ledger, events)
}

fn rejecting_ledger() -> CircleLedger {
    CircleLedger::in_memory(
        Arc::new(StaticVerifier::reject()),
        Arc::new(cozycircle_core::circle::NullSink),
    )
    .expect("should create ledger")
}

fn config(name: &str) -> CircleConfig {
    CircleConfig::new(name).with_description("A test circle")
}

// ============================================================================
// Circle Lifecycle
// ============================================================================

mod circle_lifecycle_tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing_from_one() {
        let (mut ledger, _) = accepting_ledger();

        let first = ledger.create_circle(&addr(1), &config("First")).unwrap();
        let second = ledger.create_circle(&addr(2), &config("Second")).unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[test]
    fn failed_create_does_not_disturb_the_id_sequence() {
        let (mut ledger, _) = accepting_ledger();

        ledger.create_circle(&addr(1), &config("First")).unwrap();
        assert!(matches!(
            ledger.create_circle(&addr(1), &config("")),
            Err(LedgerError::InvalidInput(_))
        ));
        let next = ledger.create_circle(&addr(1), &config("Second")).unwrap();

        // The rejected call allocated nothing.
        assert_eq!(next, 2);
    }

    #[test]
    fn creator_is_admitted_automatically() {
        let (mut ledger, _) = accepting_ledger();
        let circle_id = ledger.create_circle(&addr(1), &config("Solo")).unwrap();

        assert!(ledger.is_member(circle_id, &addr(1)).unwrap());
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().member_count, 1);
        assert_eq!(ledger.get_user_circles(&addr(1)).unwrap(), vec![circle_id]);
    }

    #[test]
    fn snapshot_for_unknown_circle_fails() {
        let (ledger, _) = accepting_ledger();
        assert!(matches!(
            ledger.get_circle_info(404),
            Err(LedgerError::NotFound(404))
        ));
    }

    #[test]
    fn archive_is_detectably_non_idempotent() {
        let (mut ledger, _) = accepting_ledger();
        let circle_id = ledger.create_circle(&addr(1), &config("Once")).unwrap();

        ledger.archive_circle(&addr(1), circle_id).unwrap();

        // A second archive never silently succeeds.
        assert!(matches!(
            ledger.archive_circle(&addr(1), circle_id),
            Err(LedgerError::CircleArchived(_))
        ));
        assert!(matches!(
            ledger.archive_circle(&addr(2), circle_id),
            Err(LedgerError::Unauthorized(_))
        ));
    }

    #[test]
    fn archived_circle_still_serves_its_last_snapshot() {
        let (mut ledger, _) = accepting_ledger();
        let circle_id = ledger.create_circle(&addr(1), &config("Frozen")).unwrap();
        ledger.join_circle(&addr(4), circle_id).unwrap();

        ledger.archive_circle(&addr(1), circle_id).unwrap();

        assert!(matches!(
            ledger.join_circle(&addr(5), circle_id),
            Err(LedgerError::CircleArchived(_))
        ));

        let view = ledger.get_circle_info(circle_id).unwrap();
        assert!(!view.is_active);
        assert_eq!(view.member_count, 2);
    }
}

// ============================================================================
// Membership Rules
// ============================================================================

mod membership_tests {
    use super::*;

    #[test]
    fn member_count_follows_memberships() {
        let (mut ledger, _) = accepting_ledger();
        let circle_id = ledger.create_circle(&addr(1), &config("Counted")).unwrap();

        for byte in 2..=5 {
            ledger.join_circle(&addr(byte), circle_id).unwrap();
        }
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().member_count, 5);

        ledger.leave_circle(&addr(3), circle_id).unwrap();
        ledger.leave_circle(&addr(4), circle_id).unwrap();
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().member_count, 3);
        assert!(!ledger.is_member(circle_id, &addr(3)).unwrap());
        assert!(ledger.is_member(circle_id, &addr(5)).unwrap());
    }

    #[test]
    fn capacity_one_circle_rejects_everyone_but_the_creator() {
        let (mut ledger, _) = accepting_ledger();
        let solo = config("Solo").with_capacity(1);
        let circle_id = ledger.create_circle(&addr(1), &solo).unwrap();

        assert!(matches!(
            ledger.join_circle(&addr(2), circle_id),
            Err(LedgerError::CircleFull(_))
        ));
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().member_count, 1);
    }

    #[test]
    fn join_at_capacity_fails_and_leaves_count_unchanged() {
        let (mut ledger, _) = accepting_ledger();
        let small = config("Small").with_capacity(3);
        let circle_id = ledger.create_circle(&addr(1), &small).unwrap();

        ledger.join_circle(&addr(2), circle_id).unwrap();
        ledger.join_circle(&addr(3), circle_id).unwrap();

        assert!(matches!(
            ledger.join_circle(&addr(4), circle_id),
            Err(LedgerError::CircleFull(_))
        ));
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().member_count, 3);

        // Someone leaving frees the seat again.
        ledger.leave_circle(&addr(2), circle_id).unwrap();
        ledger.join_circle(&addr(4), circle_id).unwrap();
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().member_count, 3);
    }

    #[test]
    fn admin_cannot_leave_without_transfer() {
        let (mut ledger, _) = accepting_ledger();
        let circle_id = ledger.create_circle(&addr(1), &config("Led")).unwrap();
        ledger.join_circle(&addr(2), circle_id).unwrap();

        assert!(matches!(
            ledger.leave_circle(&addr(1), circle_id),
            Err(LedgerError::Unauthorized(_))
        ));
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().member_count, 2);
    }

    #[test]
    fn user_circles_reflects_joins_across_circles() {
        let (mut ledger, _) = accepting_ledger();
        let first = ledger.create_circle(&addr(1), &config("First")).unwrap();
        let second = ledger.create_circle(&addr(2), &config("Second")).unwrap();
        let third = ledger.create_circle(&addr(3), &config("Third")).unwrap();

        ledger.join_circle(&addr(1), second).unwrap();
        ledger.join_circle(&addr(1), third).unwrap();
        ledger.leave_circle(&addr(1), second).unwrap();

        assert_eq!(ledger.get_user_circles(&addr(1)).unwrap(), vec![first, third]);
        assert!(ledger.get_user_circles(&addr(9)).unwrap().is_empty());
    }
}

// ============================================================================
// Activity and Verification
// ============================================================================

mod activity_tests {
    use super::*;

    #[test]
    fn close_friends_scenario() {
        // Admin A creates a private circle, B joins and posts with a valid
        // attestation, non-member C is refused the feed.
        let (mut ledger, events) = accepting_ledger();
        let a = addr(0xAA);
        let b = addr(0xBB);
        let c = addr(0xCC);

        let circle_id = ledger
            .create_circle(&a, &config("Close Friends").with_capacity(50))
            .unwrap();
        assert_eq!(circle_id, 1);
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().member_count, 1);

        ledger.join_circle(&b, circle_id).unwrap();
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().member_count, 2);

        let attestation = Attestation::new(vec![0x01; 32]);
        let index = ledger
            .post_update(
                &b,
                circle_id,
                ContentRef::new(vec![0xEE; 16]),
                Some(&attestation),
            )
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().message_count, 1);

        let records = ledger.list_updates(&b, circle_id, 0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].author, b);
        assert_eq!(records[0].content_ref, ContentRef::new(vec![0xEE; 16]));

        assert!(matches!(
            ledger.list_updates(&c, circle_id, 0),
            Err(LedgerError::NotMember(_))
        ));

        let emitted = events.take();
        assert!(emitted.contains(&LedgerEvent::MemberJoined {
            circle_id,
            member: b,
        }));
        assert!(emitted.contains(&LedgerEvent::UpdatePosted {
            circle_id,
            author: b,
            record_index: 0,
        }));
    }

    #[test]
    fn private_post_without_accepted_attestation_appends_nothing() {
        let mut ledger = rejecting_ledger();
        let circle_id = ledger.create_circle(&addr(1), &config("Sealed")).unwrap();

        // Missing attestation.
        assert!(matches!(
            ledger.post_update(&addr(1), circle_id, ContentRef::new(vec![1]), None),
            Err(LedgerError::VerificationFailed(_))
        ));
        // Rejected attestation.
        let attestation = Attestation::new(vec![0xFF]);
        assert!(matches!(
            ledger.post_update(
                &addr(1),
                circle_id,
                ContentRef::new(vec![1]),
                Some(&attestation)
            ),
            Err(LedgerError::VerificationFailed(_))
        ));

        assert_eq!(ledger.get_circle_info(circle_id).unwrap().message_count, 0);
        assert!(ledger.list_updates(&addr(1), circle_id, 0).unwrap().is_empty());
    }

    #[test]
    fn verifier_failure_is_treated_as_rejection() {
        let mut ledger = CircleLedger::in_memory(
            Arc::new(ErroringVerifier),
            Arc::new(cozycircle_core::circle::NullSink),
        )
        .unwrap();
        let circle_id = ledger.create_circle(&addr(1), &config("Sealed")).unwrap();

        let attestation = Attestation::new(vec![1]);
        let result = ledger.post_update(
            &addr(1),
            circle_id,
            ContentRef::new(vec![1]),
            Some(&attestation),
        );

        assert!(matches!(result, Err(LedgerError::VerificationFailed(_))));
        assert_eq!(ledger.get_circle_info(circle_id).unwrap().message_count, 0);
    }

    #[test]
    fn public_circle_posts_without_attestation() {
        let mut ledger = rejecting_ledger();
        let open = config("Open").with_privacy(false);
        let circle_id = ledger.create_circle(&addr(1), &open).unwrap();

        let index = ledger
            .post_update(&addr(1), circle_id, ContentRef::new(vec![7]), None)
            .unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn last_activity_advances_with_mutations() {
        let (mut ledger, _) = accepting_ledger();
        let circle_id = ledger.create_circle(&addr(1), &config("Active")).unwrap();
        let created = ledger.get_circle_info(circle_id).unwrap();

        ledger.join_circle(&addr(2), circle_id).unwrap();
        let after_join = ledger.get_circle_info(circle_id).unwrap();
        assert!(after_join.last_activity >= created.last_activity);
        assert_eq!(after_join.created_at, created.created_at);
    }
}

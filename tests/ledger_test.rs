//! Vote ledger behavior against SQLite storage.

use std::sync::Arc;

use pattern_discovery::config::VoteMode;
use pattern_discovery::storage::{SqliteStorage, VoteType};
use pattern_discovery::votes::{VoteInput, VoteLedger, VoteTally};

async fn create_ledger(mode: VoteMode) -> VoteLedger {
    let storage = SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage");
    VoteLedger::with_mode(Arc::new(storage), mode)
}

#[tokio::test]
async fn test_tally_additivity() {
    for (up, down) in [(0u64, 0u64), (1, 0), (0, 3), (4, 2), (7, 7)] {
        let ledger = create_ledger(VoteMode::Append).await;
        for i in 0..up {
            ledger
                .record_vote(VoteInput::new("sug", format!("up-{}", i), VoteType::Up))
                .await
                .unwrap();
        }
        for i in 0..down {
            ledger
                .record_vote(VoteInput::new("sug", format!("down-{}", i), VoteType::Down))
                .await
                .unwrap();
        }

        assert_eq!(
            ledger.tally("sug").await.unwrap(),
            VoteTally {
                upvotes: up,
                downvotes: down
            }
        );
    }
}

#[tokio::test]
async fn test_tally_is_scoped_to_suggestion() {
    let ledger = create_ledger(VoteMode::Append).await;
    ledger
        .record_vote(VoteInput::new("a", "s1", VoteType::Up))
        .await
        .unwrap();
    ledger
        .record_vote(VoteInput::new("b", "s1", VoteType::Down))
        .await
        .unwrap();

    assert_eq!(ledger.tally("a").await.unwrap().upvotes, 1);
    assert_eq!(ledger.tally("a").await.unwrap().downvotes, 0);
    assert_eq!(ledger.tally("missing").await.unwrap(), VoteTally::default());
}

#[tokio::test]
async fn test_user_vote_absent_is_none() {
    let ledger = create_ledger(VoteMode::Append).await;
    assert!(ledger.get_user_vote("sug", "s1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_votes_append_and_latest_is_reported() {
    let ledger = create_ledger(VoteMode::Append).await;
    ledger
        .record_vote(VoteInput::new("sug", "s1", VoteType::Up))
        .await
        .unwrap();
    let second = ledger
        .record_vote(VoteInput::new("sug", "s1", VoteType::Down))
        .await
        .unwrap();

    let tally = ledger.tally("sug").await.unwrap();
    assert_eq!(tally, VoteTally { upvotes: 1, downvotes: 1 });

    let mine = ledger.get_user_vote("sug", "s1").await.unwrap().unwrap();
    assert_eq!(mine.id, second.id);
    assert_eq!(mine.vote_type, VoteType::Down);
}

#[tokio::test]
async fn test_upsert_keeps_single_row_per_session() {
    let ledger = create_ledger(VoteMode::Upsert).await;
    for vote_type in [VoteType::Up, VoteType::Down, VoteType::Up] {
        ledger
            .record_vote(VoteInput::new("sug", "s1", vote_type).with_time_spent(45))
            .await
            .unwrap();
    }
    ledger
        .record_vote(VoteInput::new("sug", "s2", VoteType::Down))
        .await
        .unwrap();

    let votes = ledger.get_votes_for_suggestion("sug").await.unwrap();
    assert_eq!(votes.len(), 2);
    assert_eq!(
        ledger.tally("sug").await.unwrap(),
        VoteTally { upvotes: 1, downvotes: 1 }
    );
}

#[tokio::test]
async fn test_explicit_upsert_in_append_ledger() {
    let ledger = create_ledger(VoteMode::Append).await;
    ledger
        .record_vote(VoteInput::new("sug", "s1", VoteType::Up))
        .await
        .unwrap();
    ledger
        .upsert_vote(VoteInput::new("sug", "s1", VoteType::Down))
        .await
        .unwrap();

    assert_eq!(
        ledger.tally("sug").await.unwrap(),
        VoteTally { upvotes: 0, downvotes: 1 }
    );
}

#[tokio::test]
async fn test_vote_fields_persist() {
    let ledger = create_ledger(VoteMode::Append).await;
    let vote = ledger
        .record_vote(
            VoteInput::new("sug", "s1", VoteType::Up)
                .with_time_spent(90)
                .with_location("loc-1"),
        )
        .await
        .unwrap();

    let stored = ledger.get_user_vote("sug", "s1").await.unwrap().unwrap();
    assert_eq!(stored.time_spent_minutes, 90);
    assert_eq!(stored.location_id.as_deref(), Some("loc-1"));
    assert!((stored.weight - vote.weight).abs() < 1e-12);
    assert!(stored.weight > 1.0);
}

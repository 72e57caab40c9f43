//! Bet ledger, score updates and reference-data upserts on a shared database.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use fplduel::engine::{GeneratorConfig, MatchupGenerator};
use fplduel::storage::{Database, MatchupStore};
use fplduel::types::{BetAggregate, DuelError, Matchup, NewBet, Outcome, Team};

use crate::mock_sources::{ranked_pool, FixedGameweek, MockDeployer, MockRanking};

async fn generated(db: &Database) -> Vec<Matchup> {
    let gen = MatchupGenerator::new(
        Arc::new(MockRanking::new(ranked_pool(10))),
        Arc::new(FixedGameweek(3)),
        Arc::new(MockDeployer::new()),
        Arc::new(db.matchups()),
        GeneratorConfig {
            seed: Some(11),
            ..GeneratorConfig::default()
        },
    );
    gen.generate().await.unwrap().created
}

fn bet(matchup_id: &str, bettor: &str, predicted: Outcome) -> NewBet {
    NewBet {
        matchup_id: matchup_id.to_string(),
        bettor: bettor.to_string(),
        predicted,
        amount: 5,
        odds: 2.4,
        txn_ref: format!("0x{bettor}tx"),
    }
}

#[tokio::test]
async fn test_outcome_counts_on_generated_matchup() {
    let db = Database::in_memory().await.unwrap();
    let matchups = generated(&db).await;
    let target = &matchups[0].id;
    let other = &matchups[1].id;
    let ledger = db.bets();

    for (bettor, predicted) in [
        ("a", Outcome::Home),
        ("b", Outcome::Home),
        ("c", Outcome::Away),
        ("d", Outcome::Draw),
        ("e", Outcome::Draw),
        ("f", Outcome::Draw),
    ] {
        ledger.record_bet(bet(target, bettor, predicted)).await.unwrap();
    }
    // Bets on another matchup never leak into the aggregate.
    ledger.record_bet(bet(other, "a", Outcome::Away)).await.unwrap();

    assert_eq!(
        ledger.outcome_counts(target).await.unwrap(),
        BetAggregate { home: 2, away: 1, draw: 3, total: 6 }
    );
    assert_eq!(ledger.outcome_counts(other).await.unwrap().total, 1);
    assert_eq!(ledger.bets_by_bettor("a").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_outcome_counts_for_unknown_matchup() {
    let db = Database::in_memory().await.unwrap();
    generated(&db).await;

    let err = db.bets().outcome_counts("never-created").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_update_score_round_trip() {
    let db = Database::in_memory().await.unwrap();
    let id = generated(&db).await[0].id.clone();
    let store = db.matchups();

    tokio::time::sleep(Duration::from_millis(5)).await;
    store.update_score(3, 1, &id).await.unwrap();

    let m = store.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(m.home.score, 3);
    assert_eq!(m.away.score, 1);
    assert!(m.updated_at > m.created_at);
    assert!(m.is_provisioned());
}

#[tokio::test]
async fn test_concurrent_bets_are_all_counted() {
    let db = Database::in_memory().await.unwrap();
    let id = generated(&db).await[0].id.clone();

    let mut handles = Vec::new();
    for i in 0..12 {
        let ledger = db.bets();
        let id = id.clone();
        let predicted = Outcome::ALL[i % 3];
        handles.push(tokio::spawn(async move {
            ledger.record_bet(bet(&id, &format!("u{i}"), predicted)).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    let agg = db.bets().outcome_counts(&id).await.unwrap();
    assert_eq!(agg, BetAggregate::new(4, 4, 4));
}

#[tokio::test]
async fn test_team_bulk_upsert_is_all_or_nothing() {
    let db = Database::in_memory().await.unwrap();
    let teams = db.teams();
    let now = Utc::now();
    let team = |id: i64, code: i64, name: &str| Team {
        id,
        code,
        name: name.to_string(),
        short_name: name[..3].to_uppercase(),
        strength: 3,
        updated_at: now,
    };

    teams
        .bulk_upsert(&[team(1, 3, "Arsenal"), team(2, 7, "Aston Villa")])
        .await
        .unwrap();

    // Updates row 1 and inserts row 3, but row 4 reuses code 7.
    let err = teams
        .bulk_upsert(&[team(1, 3, "Arsenal FC"), team(3, 91, "Bournemouth"), team(4, 7, "Brentford")])
        .await
        .unwrap_err();
    assert!(matches!(err, DuelError::Persistence(_)));

    let stored = teams.list().await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].name, "Arsenal");
    assert!(teams.get_by_id(3).await.unwrap().is_none());
}

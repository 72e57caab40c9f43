//! End-to-end generation cycles against an in-memory database.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fplduel::engine::{GeneratorConfig, MatchupGenerator};
use fplduel::sources::retry::RetryPolicy;
use fplduel::storage::{Database, MatchupStore};
use fplduel::types::{DuelError, PoolParams};

use crate::mock_sources::{ranked_pool, FixedGameweek, FlakyStore, MockDeployer, MockRanking};

fn config(seed: u64) -> GeneratorConfig {
    GeneratorConfig {
        seed: Some(seed),
        call_timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(5),
        },
        ..GeneratorConfig::default()
    }
}

fn generator(
    ranking: Arc<MockRanking>,
    deployer: Arc<MockDeployer>,
    store: Arc<dyn MatchupStore>,
    seed: u64,
) -> MatchupGenerator {
    MatchupGenerator::new(ranking, Arc::new(FixedGameweek(9)), deployer, store, config(seed))
}

#[tokio::test]
async fn test_full_cycle_persists_and_provisions_five_matchups() {
    let db = Database::in_memory().await.unwrap();
    let deployer = Arc::new(MockDeployer::new());
    let gen = generator(
        Arc::new(MockRanking::new(ranked_pool(10))),
        deployer.clone(),
        Arc::new(db.matchups()),
        1,
    );

    let report = gen.generate().await.unwrap();
    assert_eq!(report.gameweek, 9);
    assert_eq!(report.created.len(), 5);
    assert_eq!(report.failed, 0);
    assert_eq!(report.provisioned(), 5);

    let stored = db.matchups().list_by_gameweek(9).await.unwrap();
    assert_eq!(stored.len(), 5);

    let mut entries = HashSet::new();
    for (i, m) in stored.iter().enumerate() {
        assert_eq!(m.assigned_home, i as i64);
        assert_eq!(m.slot_sum(), 9);
        assert_eq!((m.home.score, m.away.score), (0, 0));
        assert!(m.is_provisioned());
        entries.insert(m.home.entry_id);
        entries.insert(m.away.entry_id);
    }
    assert_eq!(entries, (1001..=1010).collect::<HashSet<_>>());

    // Every contract got the same pools and the same deadline.
    let deployments = deployer.deployments();
    assert_eq!(deployments.len(), 5);
    assert!(deployments.iter().all(|(pools, _)| *pools == PoolParams::default()));
    assert!(deployments.iter().all(|(_, d)| *d == deployments[0].1));
}

#[tokio::test]
async fn test_single_persistence_failure_does_not_abort_batch() {
    let db = Database::in_memory().await.unwrap();
    let deployer = Arc::new(MockDeployer::new());
    let store = Arc::new(FlakyStore::new(db.matchups(), vec![2]));
    let gen = generator(Arc::new(MockRanking::new(ranked_pool(10))), deployer.clone(), store, 2);

    let report = gen.generate().await.unwrap();
    assert_eq!(report.created.len(), 4);
    assert_eq!(report.failed, 1);
    assert_eq!(deployer.calls(), 4);
    assert_eq!(db.matchups().list_all().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_provisioning_failure_keeps_earlier_contracts() {
    let db = Database::in_memory().await.unwrap();
    let deployer = Arc::new(MockDeployer::failing_on(3));
    let gen = generator(
        Arc::new(MockRanking::new(ranked_pool(10))),
        deployer.clone(),
        Arc::new(db.matchups()),
        3,
    );

    let err = gen.generate().await.unwrap_err();
    let failed_id = match err {
        DuelError::ContractProvisioningFailed { matchup_id, .. } => matchup_id,
        other => panic!("unexpected error: {other}"),
    };
    assert_eq!(deployer.calls(), 3);

    // Nothing is rolled back: all five rows exist, the first two provisioned.
    let stored = db.matchups().list_by_gameweek(9).await.unwrap();
    assert_eq!(stored.len(), 5);
    assert!(stored[0].is_provisioned());
    assert!(stored[1].is_provisioned());
    assert_eq!(stored[2].id, failed_id);
    assert!(stored[2..].iter().all(|m| !m.is_provisioned()));
}

#[tokio::test]
async fn test_rerun_creates_second_set() {
    let db = Database::in_memory().await.unwrap();
    let gen = generator(
        Arc::new(MockRanking::new(ranked_pool(10))),
        Arc::new(MockDeployer::new()),
        Arc::new(db.matchups()),
        4,
    );

    gen.generate().await.unwrap();
    gen.generate().await.unwrap();

    let stored = db.matchups().list_by_gameweek(9).await.unwrap();
    assert_eq!(stored.len(), 10);
    let ids: HashSet<_> = stored.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_ranking_failure_writes_nothing() {
    let db = Database::in_memory().await.unwrap();
    let ranking = Arc::new(MockRanking::new(ranked_pool(10)));
    ranking.set_error("most-valuable-teams returned 503");
    let deployer = Arc::new(MockDeployer::new());
    let gen = generator(ranking.clone(), deployer.clone(), Arc::new(db.matchups()), 5);

    let err = gen.generate().await.unwrap_err();
    assert!(matches!(err, DuelError::RankingFetchFailed(_)));
    assert_eq!(ranking.calls(), 3);
    assert_eq!(deployer.calls(), 0);
    assert!(db.matchups().list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_short_ranking_is_invalid_pool_size() {
    let db = Database::in_memory().await.unwrap();
    let gen = generator(
        Arc::new(MockRanking::new(ranked_pool(8))),
        Arc::new(MockDeployer::new()),
        Arc::new(db.matchups()),
        6,
    );

    let err = gen.generate().await.unwrap_err();
    assert!(matches!(err, DuelError::InvalidPoolSize { expected: 10, actual: 8 }));
    assert!(db.matchups().list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_same_seed_same_pairings() {
    let mut runs = Vec::new();
    for _ in 0..2 {
        let db = Database::in_memory().await.unwrap();
        let gen = generator(
            Arc::new(MockRanking::new(ranked_pool(10))),
            Arc::new(MockDeployer::new()),
            Arc::new(db.matchups()),
            42,
        );
        let report = gen.generate().await.unwrap();
        let pairs: Vec<_> = report
            .created
            .iter()
            .map(|m| (m.home.entry_id, m.away.entry_id))
            .collect();
        runs.push(pairs);
    }
    assert_eq!(runs[0], runs[1]);
}

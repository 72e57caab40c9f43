//! Bet ledger: records bets and answers live per-outcome counts.
//!
//! Predicted outcomes cross the storage edge as 0/1/2 and are converted
//! back through [`Outcome::try_from`], so a corrupt row surfaces as an
//! error instead of an arbitrary integer.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use tracing::info;

use crate::types::{Bet, BetAggregate, DuelError, DuelResult, NewBet, Outcome};

#[derive(Debug, sqlx::FromRow)]
struct BetRow {
    id: i64,
    matchup_id: String,
    user_address: String,
    predicted_winner: i64,
    bet_amount: i64,
    odds: f64,
    txn_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BetRow> for Bet {
    type Error = DuelError;

    fn try_from(row: BetRow) -> DuelResult<Self> {
        Ok(Bet {
            id: row.id,
            matchup_id: row.matchup_id,
            bettor: row.user_address,
            predicted: Outcome::try_from(row.predicted_winner)?,
            amount: row.bet_amount,
            odds: row.odds,
            txn_ref: row.txn_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct BetLedger {
    pool: SqlitePool,
}

impl BetLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn matchup_exists(&self, matchup_id: &str) -> DuelResult<bool> {
        let (exists,): (i64,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM matchups WHERE id = ?1)")
                .bind(matchup_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists != 0)
    }

    /// Record a bet against an existing matchup.
    ///
    /// Stakes are not capped against the matchup's virtual pools.
    pub async fn record_bet(&self, bet: NewBet) -> DuelResult<Bet> {
        bet.validate()?;
        if !self.matchup_exists(&bet.matchup_id).await? {
            return Err(DuelError::NotFound(format!("matchup {}", bet.matchup_id)));
        }

        let now = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO bets (matchup_id, user_address, predicted_winner, bet_amount, odds, txn_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ",
        )
        .bind(&bet.matchup_id)
        .bind(&bet.bettor)
        .bind(bet.predicted.code())
        .bind(bet.amount)
        .bind(bet.odds)
        .bind(&bet.txn_ref)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            id,
            matchup = %bet.matchup_id,
            bettor = %bet.bettor,
            predicted = %bet.predicted,
            amount = bet.amount,
            "Bet recorded"
        );

        Ok(Bet {
            id,
            matchup_id: bet.matchup_id,
            bettor: bet.bettor,
            predicted: bet.predicted,
            amount: bet.amount,
            odds: bet.odds,
            txn_ref: bet.txn_ref,
            created_at: now,
            updated_at: now,
        })
    }

    /// All bets placed by one address, oldest first. Empty when none.
    pub async fn bets_by_bettor(&self, address: &str) -> DuelResult<Vec<Bet>> {
        let rows = sqlx::query_as::<_, BetRow>(
            r"
            SELECT id, matchup_id, user_address, predicted_winner, bet_amount, odds, txn_hash, created_at, updated_at
            FROM bets
            WHERE user_address = ?1
            ORDER BY id
            ",
        )
        .bind(address)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Bet::try_from).collect()
    }

    /// Live bet counts per outcome. `NotFound` for an unknown matchup,
    /// which is distinct from a matchup with zero bets.
    pub async fn outcome_counts(&self, matchup_id: &str) -> DuelResult<BetAggregate> {
        if !self.matchup_exists(matchup_id).await? {
            return Err(DuelError::NotFound(format!("matchup {matchup_id}")));
        }

        let (home, away, draw): (i64, i64, i64) = sqlx::query_as(
            r"
            SELECT
                COALESCE(SUM(CASE WHEN predicted_winner = ?2 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN predicted_winner = ?3 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN predicted_winner = ?4 THEN 1 ELSE 0 END), 0)
            FROM bets
            WHERE matchup_id = ?1
            ",
        )
        .bind(matchup_id)
        .bind(Outcome::Home.code())
        .bind(Outcome::Away.code())
        .bind(Outcome::Draw.code())
        .fetch_one(&self.pool)
        .await?;

        Ok(BetAggregate::new(home as u64, away as u64, draw as u64))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Database, MatchupStore};
    use crate::types::{MatchupSide, NewMatchup};

    fn side(entry_id: i64) -> MatchupSide {
        MatchupSide {
            entry_id,
            name: format!("Team {entry_id}"),
            manager_name: "Manager".into(),
            value: 1000,
            transfers: 0,
            score: 0,
        }
    }

    async fn setup() -> (Database, String) {
        let db = Database::in_memory().await.unwrap();
        let matchup = db
            .matchups()
            .create(&NewMatchup {
                home: side(1),
                away: side(2),
                assigned_home: 0,
                assigned_away: 9,
                gameweek: 4,
            })
            .await
            .unwrap();
        (db, matchup.id)
    }

    fn bet(matchup_id: &str, bettor: &str, predicted: Outcome) -> NewBet {
        NewBet {
            matchup_id: matchup_id.to_string(),
            bettor: bettor.to_string(),
            predicted,
            amount: 25,
            odds: 2.1,
            txn_ref: "0xtx".into(),
        }
    }

    #[tokio::test]
    async fn test_outcome_counts() {
        let (db, id) = setup().await;
        let ledger = db.bets();

        for predicted in [
            Outcome::Home,
            Outcome::Home,
            Outcome::Away,
            Outcome::Draw,
            Outcome::Draw,
            Outcome::Draw,
        ] {
            ledger.record_bet(bet(&id, "0xa", predicted)).await.unwrap();
        }

        let agg = ledger.outcome_counts(&id).await.unwrap();
        assert_eq!(agg, BetAggregate { home: 2, away: 1, draw: 3, total: 6 });
    }

    #[tokio::test]
    async fn test_outcome_counts_zero_bets() {
        let (db, id) = setup().await;
        let agg = db.bets().outcome_counts(&id).await.unwrap();
        assert_eq!(agg, BetAggregate::default());
    }

    #[tokio::test]
    async fn test_outcome_counts_unknown_matchup() {
        let (db, _) = setup().await;
        let err = db.bets().outcome_counts("never-created").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_counts_are_live() {
        let (db, id) = setup().await;
        let ledger = db.bets();

        ledger.record_bet(bet(&id, "0xa", Outcome::Away)).await.unwrap();
        assert_eq!(ledger.outcome_counts(&id).await.unwrap().total, 1);

        ledger.record_bet(bet(&id, "0xb", Outcome::Away)).await.unwrap();
        assert_eq!(ledger.outcome_counts(&id).await.unwrap().away, 2);
    }

    #[tokio::test]
    async fn test_record_bet_unknown_matchup() {
        let (db, _) = setup().await;
        let err = db.bets().record_bet(bet("ghost", "0xa", Outcome::Home)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_record_bet_rejects_bad_amount() {
        let (db, id) = setup().await;
        let mut b = bet(&id, "0xa", Outcome::Home);
        b.amount = -5;
        let err = db.bets().record_bet(b).await.unwrap_err();
        assert!(matches!(err, DuelError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_bets_by_bettor() {
        let (db, id) = setup().await;
        let ledger = db.bets();

        let first = ledger.record_bet(bet(&id, "0xa", Outcome::Home)).await.unwrap();
        ledger.record_bet(bet(&id, "0xb", Outcome::Draw)).await.unwrap();
        ledger.record_bet(bet(&id, "0xa", Outcome::Draw)).await.unwrap();

        let bets = ledger.bets_by_bettor("0xa").await.unwrap();
        assert_eq!(bets.len(), 2);
        assert_eq!(bets[0].id, first.id);
        assert_eq!(bets[0].predicted, Outcome::Home);
        assert_eq!(bets[1].predicted, Outcome::Draw);

        assert!(ledger.bets_by_bettor("0xnobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bet_does_not_touch_scores() {
        let (db, id) = setup().await;
        db.bets().record_bet(bet(&id, "0xa", Outcome::Home)).await.unwrap();

        let m = db.matchups().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!((m.home.score, m.away.score), (0, 0));
    }
}

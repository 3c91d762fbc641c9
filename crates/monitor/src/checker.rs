use crate::metrics;
use finality_types::{BlockNumber, CheckpointInterval, Snapshot};
use std::ops::Range;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// A snapshot that breaks the checkpoint-consistency rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("sampling round incomplete:\n{}", .0.join("\n"))]
    FetchErrors(Vec<String>),

    #[error(
        "best block {best} is below {steady_phase_start} (2 epochs - 1) but justified={justified} and finalized={finalized}; both must be 0"
    )]
    EarlyPhase {
        best: BlockNumber,
        justified: BlockNumber,
        finalized: BlockNumber,
        steady_phase_start: u64,
    },

    #[error(
        "clause a: justified {justified} - finalized {finalized} must equal the checkpoint interval {interval}"
    )]
    JustifiedFinalizedGap {
        justified: BlockNumber,
        finalized: BlockNumber,
        interval: u32,
    },

    #[error(
        "clause b: best {best} - justified {justified} must lie in [{}, {})",
        .allowed.start, .allowed.end
    )]
    JustifiedLead {
        best: BlockNumber,
        justified: BlockNumber,
        allowed: Range<u64>,
    },

    #[error(
        "clause c: best {best} - finalized {finalized} must lie in [{}, {})",
        .allowed.start, .allowed.end
    )]
    FinalizedLead {
        best: BlockNumber,
        finalized: BlockNumber,
        allowed: Range<u64>,
    },

    #[error("clause d: block {number} after finalized block {finalized} is already finalized")]
    SuccessorFinalized {
        finalized: BlockNumber,
        number: BlockNumber,
    },
}

/// Judges each snapshot on its own; no state is carried between rounds.
#[derive(Debug, Clone, Copy)]
pub struct Checker {
    interval: CheckpointInterval,
}

impl Checker {
    pub fn new(interval: CheckpointInterval) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> CheckpointInterval {
        self.interval
    }

    /// Evaluate the checkpoint-consistency rules against one snapshot.
    ///
    /// Below `2C - 1` nothing may be justified or finalized yet. From there
    /// on, with `C` the checkpoint interval:
    ///
    /// * a. `justified - finalized == C`
    /// * b. `C - 1 <= best - justified < 2C - 1`
    /// * c. `2C - 1 <= best - finalized < 3C - 1`
    /// * d. the block right after `finalized` is not finalized
    ///
    /// A negative difference fails the clause it appears in.
    pub fn check(&self, snapshot: &Snapshot) -> Result<(), Violation> {
        if !snapshot.is_complete() {
            return Err(Violation::FetchErrors(snapshot.errors.clone()));
        }

        let Snapshot {
            best,
            justified,
            finalized,
            after_finalized,
            ..
        } = *snapshot;

        let steady_phase_start = self.interval.steady_phase_start();
        if u64::from(best) < steady_phase_start {
            if justified != 0 || finalized != 0 {
                return Err(Violation::EarlyPhase {
                    best,
                    justified,
                    finalized,
                    steady_phase_start,
                });
            }
            return Ok(());
        }

        if justified.checked_sub(finalized) != Some(self.interval.length()) {
            return Err(Violation::JustifiedFinalizedGap {
                justified,
                finalized,
                interval: self.interval.length(),
            });
        }

        let allowed = self.interval.justified_lead();
        if !lead_within(best, justified, &allowed) {
            return Err(Violation::JustifiedLead {
                best,
                justified,
                allowed,
            });
        }

        let allowed = self.interval.finalized_lead();
        if !lead_within(best, finalized, &allowed) {
            return Err(Violation::FinalizedLead {
                best,
                finalized,
                allowed,
            });
        }

        if after_finalized.is_finalized {
            return Err(Violation::SuccessorFinalized {
                finalized,
                number: after_finalized.number,
            });
        }

        Ok(())
    }

    /// Consume snapshots in arrival order until one fails or the sampler
    /// hangs up. Returns the number of rounds that passed.
    pub async fn run(&self, mut snapshots: mpsc::Receiver<Snapshot>) -> Result<u64, Violation> {
        let mut rounds = 0u64;
        while let Some(snapshot) = snapshots.recv().await {
            if let Err(violation) = self.check(&snapshot) {
                metrics::record_violation();
                error!(%snapshot, %violation, "checkpoint consistency check failed");
                return Err(violation);
            }
            rounds += 1;
            debug!(
                round = rounds,
                best = snapshot.best,
                justified = snapshot.justified,
                finalized = snapshot.finalized,
                epoch_start = self.interval.checkpoint_of(snapshot.best),
                store_point = self.interval.store_point(snapshot.best),
                "round consistent"
            );
        }
        info!(rounds, "snapshot channel closed");
        Ok(rounds)
    }
}

fn lead_within(best: BlockNumber, behind: BlockNumber, allowed: &Range<u64>) -> bool {
    best.checked_sub(behind)
        .is_some_and(|lead| allowed.contains(&u64::from(lead)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use finality_types::BlockSummary;

    const C: u32 = 180;

    fn checker() -> Checker {
        Checker::new(CheckpointInterval::new(C).unwrap())
    }

    fn snapshot(best: u32, justified: u32, finalized: u32) -> Snapshot {
        Snapshot {
            best,
            justified,
            finalized,
            after_finalized: BlockSummary {
                number: finalized + 1,
                is_finalized: false,
            },
            errors: Vec::new(),
        }
    }

    #[test]
    fn early_chain_with_nothing_justified_passes() {
        assert_eq!(checker().check(&snapshot(100, 0, 0)), Ok(()));
        assert_eq!(checker().check(&snapshot(0, 0, 0)), Ok(()));
    }

    #[test]
    fn early_chain_with_justified_or_finalized_fails() {
        for (justified, finalized) in [(180, 0), (0, 1), (360, 180)] {
            let err = checker()
                .check(&snapshot(300, justified, finalized))
                .unwrap_err();
            assert!(matches!(err, Violation::EarlyPhase { .. }), "{err}");
        }
    }

    #[test]
    fn steady_chain_with_consistent_heights_passes() {
        assert_eq!(checker().check(&snapshot(500, 320, 140)), Ok(()));
    }

    #[test]
    fn successor_already_finalized_fails_clause_d() {
        let mut snap = snapshot(500, 320, 140);
        snap.after_finalized.is_finalized = true;
        assert_eq!(
            checker().check(&snap),
            Err(Violation::SuccessorFinalized {
                finalized: 140,
                number: 141
            })
        );
    }

    #[test]
    fn wrong_justified_finalized_gap_fails_clause_a() {
        let err = checker().check(&snapshot(500, 320, 100)).unwrap_err();
        assert!(matches!(err, Violation::JustifiedFinalizedGap { .. }));
        assert!(err.to_string().starts_with("clause a"));
    }

    #[test]
    fn finalized_above_justified_fails_clause_a() {
        let err = checker().check(&snapshot(500, 100, 280)).unwrap_err();
        assert!(matches!(err, Violation::JustifiedFinalizedGap { .. }));
    }

    #[test]
    fn justified_lead_bounds_are_half_open() {
        // best - justified == 178: one below C - 1
        let err = checker().check(&snapshot(538, 360, 180)).unwrap_err();
        assert!(matches!(err, Violation::JustifiedLead { .. }), "{err}");

        // best - justified == 179 and best - finalized == 359
        assert_eq!(checker().check(&snapshot(539, 360, 180)), Ok(()));

        // best - justified == 358 and best - finalized == 538
        assert_eq!(checker().check(&snapshot(538, 180, 0)), Ok(()));

        // best - justified == 359: reaches 2C - 1
        let err = checker().check(&snapshot(539, 180, 0)).unwrap_err();
        assert!(matches!(err, Violation::JustifiedLead { .. }), "{err}");
    }

    #[test]
    fn justified_ahead_of_best_fails_clause_b() {
        let err = checker().check(&snapshot(400, 600, 420)).unwrap_err();
        assert!(matches!(err, Violation::JustifiedLead { .. }), "{err}");
    }

    #[test]
    fn finalized_lead_bounds_are_checked() {
        let checker = Checker::new(CheckpointInterval::new(10).unwrap());
        // Clause c is implied by a and b, so exercise the bound directly.
        // C = 10 allows best - finalized in [19, 29).
        assert!(lead_within(40, 21, &checker.interval().finalized_lead()));
        assert!(!lead_within(40, 22, &checker.interval().finalized_lead()));
        assert!(lead_within(40, 12, &checker.interval().finalized_lead()));
        assert!(!lead_within(40, 11, &checker.interval().finalized_lead()));
        assert!(!lead_within(10, 11, &checker.interval().finalized_lead()));
    }

    #[test]
    fn phase_boundary_at_two_epochs_minus_one() {
        // 2C - 2: still early phase
        assert_eq!(checker().check(&snapshot(358, 0, 0)), Ok(()));
        // 2C - 1: steady phase needs justified/finalized
        let err = checker().check(&snapshot(359, 0, 0)).unwrap_err();
        assert!(matches!(err, Violation::JustifiedFinalizedGap { .. }));
        assert_eq!(checker().check(&snapshot(359, 180, 0)), Ok(()));
    }

    #[test]
    fn fetch_errors_fail_regardless_of_heights() {
        let mut snap = snapshot(100, 0, 0);
        snap.errors = vec![
            "error getting justified block: transport error".into(),
            "error getting finalized block: status code not 200".into(),
        ];
        let err = checker().check(&snap).unwrap_err();
        assert_eq!(
            err.to_string(),
            "sampling round incomplete:\nerror getting justified block: transport error\nerror getting finalized block: status code not 200"
        );
    }

    #[test]
    fn each_steady_clause_fails_alone() {
        let base = snapshot(500, 320, 140);
        assert_eq!(checker().check(&base), Ok(()));

        let mut a = base.clone();
        a.finalized = 141;
        a.after_finalized.number = 142;
        assert!(matches!(
            checker().check(&a),
            Err(Violation::JustifiedFinalizedGap { .. })
        ));

        let mut b = base.clone();
        b.best = 320 + 2 * C - 1;
        assert!(matches!(
            checker().check(&b),
            Err(Violation::JustifiedLead { .. })
        ));

        let mut d = base;
        d.after_finalized.is_finalized = true;
        assert!(matches!(
            checker().check(&d),
            Err(Violation::SuccessorFinalized { .. })
        ));
    }

    #[tokio::test]
    async fn run_stops_at_first_violation() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(snapshot(100, 0, 0)).await.unwrap();
        tx.send(snapshot(500, 320, 140)).await.unwrap();
        tx.send(snapshot(500, 320, 100)).await.unwrap();
        tx.send(snapshot(600, 420, 240)).await.unwrap();
        drop(tx);

        let err = checker().run(rx).await.unwrap_err();
        assert!(matches!(err, Violation::JustifiedFinalizedGap { .. }));
    }

    #[tokio::test]
    async fn run_counts_passing_rounds_until_channel_closes() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(snapshot(100, 0, 0)).await.unwrap();
        tx.send(snapshot(500, 320, 140)).await.unwrap();
        drop(tx);

        assert_eq!(checker().run(rx).await, Ok(2));
    }
}

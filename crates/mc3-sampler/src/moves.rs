use mc3_core::errors::ErrorInfo;
use mc3_core::{Mc3Error, MoveTuningRecord, RngHandle};
use serde::{Deserialize, Serialize};

/// Acceptance rate single-coordinate proposals are tuned toward.
pub const TARGET_ACCEPTANCE: f64 = 0.44;

/// Kind of perturbation a proposal applies to its coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveKind {
    /// Additive window centered on the current value.
    Slide,
    /// Multiplicative factor `exp(lambda * (u - 1/2))`.
    Scale,
}

/// One tunable proposal distribution bound to a coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalMove {
    /// Stable name used to pair bookkeeping across chains.
    pub name: String,
    /// Perturbation kind.
    pub kind: MoveKind,
    /// Coordinate this move perturbs.
    pub coordinate: usize,
    /// Relative pick weight within a cycle.
    pub weight: f64,
    tuning: f64,
    tunable: bool,
    tried_period: u64,
    tried_total: u64,
    accepted_period: u64,
    accepted_total: u64,
}

impl ProposalMove {
    /// Window move adding `delta * (u - 1/2)` to one coordinate.
    pub fn slide(name: impl Into<String>, coordinate: usize, delta: f64, weight: f64) -> Self {
        Self::new(name, MoveKind::Slide, coordinate, delta, weight)
    }

    /// Multiplier move scaling one coordinate by `exp(lambda * (u - 1/2))`.
    pub fn scale(name: impl Into<String>, coordinate: usize, lambda: f64, weight: f64) -> Self {
        Self::new(name, MoveKind::Scale, coordinate, lambda, weight)
    }

    fn new(
        name: impl Into<String>,
        kind: MoveKind,
        coordinate: usize,
        tuning: f64,
        weight: f64,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            coordinate,
            weight,
            tuning,
            tunable: true,
            tried_period: 0,
            tried_total: 0,
            accepted_period: 0,
            accepted_total: 0,
        }
    }

    /// Freezes the current parameter, excluding the move from tuning.
    pub fn fixed(mut self) -> Self {
        self.tunable = false;
        self
    }

    /// Current tuning parameter.
    pub fn tuning(&self) -> f64 {
        self.tuning
    }

    /// Whether the parameter adapts during burn-in.
    pub fn is_tunable(&self) -> bool {
        self.tunable
    }

    /// Proposes a new value for the coordinate, returning it together with
    /// the log Hastings ratio of the proposal.
    pub fn propose(&self, current: f64, rng: &mut RngHandle) -> (f64, f64) {
        let u = rng.uniform01();
        match self.kind {
            MoveKind::Slide => (current + self.tuning * (u - 0.5), 0.0),
            MoveKind::Scale => {
                let factor = (self.tuning * (u - 0.5)).exp();
                (current * factor, factor.ln())
            }
        }
    }

    /// Books one attempt.
    pub fn record(&mut self, accepted: bool) {
        self.tried_period += 1;
        self.tried_total += 1;
        if accepted {
            self.accepted_period += 1;
            self.accepted_total += 1;
        }
    }

    /// Retunes the parameter toward the target rate and opens a new period.
    ///
    /// The parameter widens in proportion to the excess when the period rate
    /// is high and shrinks by up to half when it is low. Untunable moves and
    /// empty periods are left alone.
    pub fn auto_tune(&mut self) {
        if !self.tunable || self.tried_period == 0 {
            return;
        }
        let rate = self.accepted_period as f64 / self.tried_period as f64;
        if rate > TARGET_ACCEPTANCE {
            self.tuning *= 1.0 + (rate - TARGET_ACCEPTANCE) / (1.0 - TARGET_ACCEPTANCE);
        } else {
            self.tuning /= 2.0 - rate / TARGET_ACCEPTANCE;
        }
        self.tried_period = 0;
        self.accepted_period = 0;
    }

    /// Snapshot of the bookkeeping in the shared record form.
    pub fn record_view(&self) -> MoveTuningRecord {
        let mut record = MoveTuningRecord::new(self.name.as_str());
        record.weight = self.weight;
        record.tried_period = self.tried_period;
        record.tried_total = self.tried_total;
        record.accepted_period = self.accepted_period;
        record.accepted_total = self.accepted_total;
        if self.tunable {
            record = record.with_parameter(self.tuning);
        }
        record
    }

    /// Overwrites the bookkeeping from a record gathered elsewhere.
    pub fn apply_record(&mut self, record: &MoveTuningRecord) -> Result<(), Mc3Error> {
        if record.name != self.name {
            return Err(Mc3Error::Tuning(
                ErrorInfo::new("record-name", "incoming record belongs to a different move")
                    .with_context("move", self.name.clone())
                    .with_context("record", record.name.clone()),
            ));
        }
        if record.is_tunable() != self.tunable {
            return Err(Mc3Error::Tuning(
                ErrorInfo::new("record-parameter", "incoming record disagrees on tunability")
                    .with_context("move", self.name.clone()),
            ));
        }
        self.tried_period = record.tried_period;
        self.tried_total = record.tried_total;
        self.accepted_period = record.accepted_period;
        self.accepted_total = record.accepted_total;
        if self.tunable {
            self.tuning = record.tuning_parameter;
        }
        Ok(())
    }
}

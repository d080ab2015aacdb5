use mc3_core::errors::{ErrorInfo, Mc3Error};
use mc3_core::{MoveTuningRecord, TemperedChain};

/// Minimal chain used to exercise the contract without a real sampler.
struct CountingChain {
    cycles: u64,
    heat: f64,
    active: bool,
    index: usize,
    records: Vec<MoveTuningRecord>,
}

impl CountingChain {
    fn new() -> Self {
        Self {
            cycles: 0,
            heat: 1.0,
            active: true,
            index: 0,
            records: vec![
                MoveTuningRecord::new("slide").with_parameter(1.0),
                MoveTuningRecord::new("scale").with_parameter(0.5),
            ],
        }
    }
}

impl TemperedChain for CountingChain {
    fn advance_cycle(&mut self, _sampling: bool) -> Result<(), Mc3Error> {
        self.cycles += 1;
        for record in &mut self.records {
            record.tried_period += 1;
            record.tried_total += 1;
        }
        Ok(())
    }

    fn log_posterior(&self, likelihood_only: bool) -> f64 {
        if likelihood_only {
            -1.0
        } else {
            -2.0
        }
    }

    fn heat(&self) -> f64 {
        self.heat
    }

    fn set_heat(&mut self, heat: f64) {
        self.heat = heat;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn chain_index(&self) -> usize {
        self.index
    }

    fn set_chain_index(&mut self, index: usize) {
        self.index = index;
    }

    fn tuning_records(&self) -> Vec<MoveTuningRecord> {
        self.records.clone()
    }

    fn set_tuning_records(&mut self, records: Vec<MoveTuningRecord>) -> Result<(), Mc3Error> {
        if records.len() != self.records.len() {
            return Err(Mc3Error::Tuning(ErrorInfo::new(
                "record-count",
                "incoming record count does not match move list",
            )));
        }
        self.records = records;
        Ok(())
    }

    fn tune(&mut self) {
        for record in &mut self.records {
            record.tried_period = 0;
            record.accepted_period = 0;
        }
    }

    fn checkpoint(&self) -> Result<String, Mc3Error> {
        Ok(format!("{}:{}", self.cycles, self.index))
    }

    fn restore(&mut self, payload: &str) -> Result<(), Mc3Error> {
        let (cycles, index) = payload.split_once(':').ok_or_else(|| {
            Mc3Error::Serde(ErrorInfo::new("payload-shape", "expected cycles:index"))
        })?;
        self.cycles = cycles.parse().map_err(|_| {
            Mc3Error::Serde(ErrorInfo::new("payload-cycles", "not an integer"))
        })?;
        self.index = index.parse().map_err(|_| {
            Mc3Error::Serde(ErrorInfo::new("payload-index", "not an integer"))
        })?;
        Ok(())
    }
}

#[test]
fn contract_round_trips_through_trait_object_free_usage() {
    let mut chain = CountingChain::new();
    chain.advance_cycle(false).unwrap();
    chain.advance_cycle(true).unwrap();
    assert_eq!(chain.cycles, 2);

    chain.set_heat(0.8);
    chain.set_active(false);
    chain.set_chain_index(3);
    assert_eq!(chain.heat(), 0.8);
    assert!(!chain.is_active());
    assert_eq!(chain.chain_index(), 3);

    let payload = chain.checkpoint().unwrap();
    let mut fresh = CountingChain::new();
    fresh.restore(&payload).unwrap();
    assert_eq!(fresh.cycles, 2);
    assert_eq!(fresh.index, 3);
}

#[test]
fn tuning_records_swap_between_chains() {
    let mut chain_a = CountingChain::new();
    let mut chain_b = CountingChain::new();
    chain_a.advance_cycle(false).unwrap();

    let records_a = chain_a.tuning_records();
    let records_b = chain_b.tuning_records();
    chain_a.set_tuning_records(records_b.clone()).unwrap();
    chain_b.set_tuning_records(records_a.clone()).unwrap();

    assert!(chain_a
        .tuning_records()
        .iter()
        .zip(records_b.iter())
        .all(|(lhs, rhs)| lhs.matches(rhs)));
    assert!(chain_b
        .tuning_records()
        .iter()
        .zip(records_a.iter())
        .all(|(lhs, rhs)| lhs.matches(rhs)));
}

#[test]
fn mismatched_record_count_is_rejected() {
    let mut chain = CountingChain::new();
    let err = chain
        .set_tuning_records(vec![MoveTuningRecord::new("slide")])
        .unwrap_err();
    assert_eq!(err.info().code, "record-count");
}

#[test]
fn record_helpers_handle_untunable_moves() {
    let mut record = MoveTuningRecord::new("gibbs");
    assert!(!record.is_tunable());
    assert_eq!(record.period_acceptance(), 0.0);

    record.tried_period = 4;
    record.accepted_period = 1;
    assert!((record.period_acceptance() - 0.25).abs() < 1e-12);

    // NaN parameters compare equal through the structural matcher.
    let twin = record.clone();
    assert!(record.matches(&twin));

    let tunable = record.clone().with_parameter(0.7);
    assert!(!record.matches(&tunable));
}

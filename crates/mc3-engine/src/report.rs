use mc3_core::MoveTuningRecord;

use crate::ladder::HeatLadder;

/// Fixed-width table of every move's acceptance counts and tuning parameter.
/// Untunable moves show a dash in the tuning column.
pub fn operator_summary(records: &[MoveTuningRecord]) -> String {
    let name_width = records
        .iter()
        .map(|record| record.name.len())
        .max()
        .unwrap_or(0)
        .max(4);
    let mut out = String::new();
    out.push_str(&format!(
        "{:>name_width$} | {:>6} | {:>9} | {:>9} | {:>10} | {:>8}\n",
        "Name", "Weight", "Tried", "Accepted", "Acc. ratio", "Tuning"
    ));
    out.push_str(&format!(
        "{}-+-{}-+-{}-+-{}-+-{}-+-{}\n",
        "-".repeat(name_width),
        "-".repeat(6),
        "-".repeat(9),
        "-".repeat(9),
        "-".repeat(10),
        "-".repeat(8)
    ));
    for record in records {
        let tuning = if record.is_tunable() {
            format!("{:.4}", record.tuning_parameter)
        } else {
            "-".to_string()
        };
        out.push_str(&format!(
            "{:>name_width$} | {:>6.2} | {:>9} | {:>9} | {:>10.4} | {:>8}\n",
            record.name,
            record.weight,
            record.tried_total,
            record.accepted_total,
            record.total_acceptance(),
            tuning
        ));
    }
    out
}

/// Fixed-width view of the ladder: one row per rank, with the swap counts of
/// the pair formed with the next-hotter rank.
pub fn ladder_summary(ladder: &HeatLadder) -> String {
    let order = ladder.ranked_chains();
    let stats = ladder.statistics();
    let mut out = String::from("Rank | Chain |     Heat | Attempted | Accepted |  Rate\n");
    out.push_str("-----+-------+----------+-----------+----------+------\n");
    for (rank, &chain) in order.iter().enumerate() {
        let (attempted, accepted, rate) = if rank + 1 < order.len() {
            let attempted = stats.attempted_between(rank, rank + 1);
            let accepted = stats.accepted_between(rank, rank + 1);
            let rate = if attempted == 0 {
                0.0
            } else {
                accepted as f64 / attempted as f64
            };
            (
                attempted.to_string(),
                accepted.to_string(),
                format!("{rate:.3}"),
            )
        } else {
            ("-".to_string(), "-".to_string(), "-".to_string())
        };
        out.push_str(&format!(
            "{rank:>4} | {chain:>5} | {heat:>8.5} | {attempted:>9} | {accepted:>8} | {rate:>5}\n",
            heat = ladder.heat_of(chain),
        ));
    }
    out
}

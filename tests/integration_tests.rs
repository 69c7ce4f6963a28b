use atspm_tmc::align::align;
use atspm_tmc::flatten::flatten;
use atspm_tmc::report::ReportDocument;
use atspm_tmc::summary::{TimeWindow, summarize};
use chrono::NaiveTime;

fn fixture() -> ReportDocument {
    let bytes = include_bytes!("fixtures/tmc_7115_2024-11-06.json");
    serde_json::from_slice(bytes).expect("Failed to parse fixture")
}

#[test]
fn test_full_pipeline() {
    let flat = flatten("7115", &fixture());

    // One volume entry carries a non-numeric count.
    assert_eq!(flat.samples.len(), 9);
    assert_eq!(flat.plans.len(), 5);
    assert_eq!(flat.issues.len(), 1);

    let alignment = align(flat.samples, flat.plans);
    let rows: Vec<_> = alignment
        .rows
        .iter()
        .map(|r| {
            (
                r.timestamp.format("%H:%M:%S").to_string(),
                r.direction.as_str(),
                r.plan_number,
                r.count,
            )
        })
        .collect();

    assert_eq!(
        rows,
        vec![
            ("06:00:00".to_string(), "Northbound", 1, 14),
            ("06:30:00".to_string(), "Southbound", 1, 4),
            ("08:55:00".to_string(), "Northbound", 1, 22),
            ("09:00:00".to_string(), "Northbound", 2, 18),
            ("10:00:00".to_string(), "Southbound", 2, 6),
            ("15:00:00".to_string(), "Northbound", 3, 25),
        ]
    );
    // 05:55 precedes every plan, 19:00 is past the PM peak, Eastbound has no plans.
    assert_eq!(alignment.dropped.no_preceding_plan, 2);
    assert_eq!(alignment.dropped.past_plan_end, 1);
    assert!(
        alignment
            .rows
            .iter()
            .all(|r| r.location_description == "State St & 400 S")
    );

    let am = TimeWindow::new(
        NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    );
    let summary = summarize(&alignment.rows, am);
    let totals: Vec<_> = summary
        .daily_totals
        .iter()
        .map(|d| (d.direction.as_str(), d.plan_description.as_str(), d.total))
        .collect();
    assert_eq!(
        totals,
        vec![
            ("Northbound", "AM Peak", 36),
            ("Northbound", "Midday", 18),
            ("Southbound", "AM Peak", 4),
        ]
    );
}

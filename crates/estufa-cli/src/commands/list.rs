use serde::Serialize;

use estufa_core::format::format_percent;
use estufa_core::{Entity, EstufaClient, EstufaKpis, FetchOutcome, SystemClock};

use super::Overrides;

#[derive(Serialize)]
struct ListEntry<'a> {
    id: &'a str,
    broker: &'a str,
    #[serde(flatten)]
    kpis: EstufaKpis,
}

pub fn run(overrides: Overrides, json: bool) {
    let config = super::load_config(overrides);
    let client = EstufaClient::from_config(&config);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {e}");
            std::process::exit(1);
        }
    };
    let outcome = rt.block_on(client.fetch_entities());
    let threshold = config.inactive_threshold();
    let rows: Vec<(&Entity, EstufaKpis)> = outcome
        .entities
        .iter()
        .map(|e| (e, EstufaKpis::compute(e, &SystemClock, threshold)))
        .collect();

    if json {
        print_json(&outcome, rows);
    } else {
        print_table(&outcome, &rows);
    }
}

fn print_json(outcome: &FetchOutcome, rows: Vec<(&Entity, EstufaKpis)>) {
    let entries: Vec<ListEntry> = rows
        .into_iter()
        .map(|(e, kpis)| ListEntry {
            id: &e.id,
            broker: &e.broker,
            kpis,
        })
        .collect();
    let body = serde_json::json!({
        "source": outcome.source,
        "estufas": entries,
    });
    match serde_json::to_string_pretty(&body) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_table(outcome: &FetchOutcome, rows: &[(&Entity, EstufaKpis)]) {
    println!(
        "{} installation(s) [{} data]\n",
        rows.len(),
        outcome.source
    );
    if rows.is_empty() {
        println!("  (none)");
        return;
    }
    println!(
        "  {:<16} {:<18} {:>7} {:>10} {:>9} {:>9}  {}",
        "ID", "BROKER", "SENSORS", "HUMIDITY", "BATTERY", "INACTIVE", "PROCESS"
    );
    for (e, k) in rows {
        let process = k.active_process.as_deref().unwrap_or("—");
        let broker = if e.broker.is_empty() { "—" } else { &e.broker };
        println!(
            "  {:<16} {:<18} {:>7} {:>10} {:>9} {:>9}  {}",
            e.id,
            broker,
            k.sensor_count,
            format_percent(k.humidity_average),
            format_percent(k.min_battery),
            k.inactive_count,
            process
        );
    }
}

//! Downstream reach lookup.
//!
//! Lists the reaches below a gauge's reach so its correction can be
//! propagated to them. By default the walk stays on the gauge's stream
//! order (plus the first reach where the order changes).
//!
//! Usage:
//!   find_downstream drainage_lines.csv 9007781
//!   find_downstream drainage_lines.csv 9007781 --any-order

use flowprop::network::StreamNetwork;

use std::env;

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut positional = Vec::new();
    let mut same_order = true;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--any-order" => same_order = false,
            other if other.starts_with("--") => {
                return Err(format!("Unknown argument: {}", other).into());
            }
            value => positional.push(value),
        }
    }

    let [path, comid] = positional[..] else {
        return Err("expected a connectivity CSV and a COMID".into());
    };
    let comid: i64 = comid
        .parse()
        .map_err(|e| format!("COMID '{}' is not an integer: {}", comid, e))?;

    let network = StreamNetwork::load(path)?;
    tracing::info!(reaches = network.len(), path, "loaded stream network");

    let ids = network.downstream_ids(comid, same_order)?;
    if ids.is_empty() {
        println!("🏁 Reach {} drains directly to an outlet", comid);
    } else {
        println!("🌊 {} reaches downstream of {}:", ids.len(), comid);
        for id in ids {
            println!("{}", id);
        }
    }
    Ok(())
}

fn main() {
    flowprop::init_logging();

    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args) {
        eprintln!("❌ {}", e);
        eprintln!(
            "Usage: {} CONNECTIVITY.csv COMID [--any-order]",
            args.first().map(String::as_str).unwrap_or("find_downstream")
        );
        std::process::exit(1);
    }
}

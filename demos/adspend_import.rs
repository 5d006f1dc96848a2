use std::path::Path;

use marketdash::import_ad_spend_file;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let path = args
        .get(1)
        .map(String::as_str)
        .unwrap_or("demos/data/ad_spends.csv");

    match import_ad_spend_file(Path::new(path)) {
        Ok(batch) => {
            println!(
                "{}: {} rows imported, {} skipped",
                path,
                batch.inserted(),
                batch.skipped
            );
            for payload in batch.payloads.iter().take(10) {
                println!(
                    "  {} {:<16} {:.2}",
                    payload.date,
                    payload.sub_id.as_deref().unwrap_or("(geral)"),
                    payload.amount
                );
            }
            if batch.payloads.len() > 10 {
                println!("  ... and {} more", batch.payloads.len() - 10);
            }
        }
        Err(err) => {
            eprintln!("import failed: {}", err);
            std::process::exit(1);
        }
    }
}

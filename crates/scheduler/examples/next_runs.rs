//! Print the next few occurrences of a pattern given on the command line.
//!
//! ```sh
//! cargo run --example next_runs -- "*/15 9-17 * * mon-fri"
//! ```

use chrono::Utc;

use crontide_scheduler::{Predictor, SchedulingPattern};

fn main() -> anyhow::Result<()> {
    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "0 9 * * mon-fri".to_string());

    let pattern = SchedulingPattern::parse(&text)?;
    println!("pattern: {pattern}");

    let mut predictor = Predictor::from_utc(pattern, Utc::now());
    for _ in 0..10 {
        match predictor.next_matching_date() {
            Some(at) => println!("  {at} UTC"),
            None => {
                println!("  (no further match within the search horizon)");
                break;
            }
        }
    }
    Ok(())
}

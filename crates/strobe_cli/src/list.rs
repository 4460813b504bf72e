//! `strobe list` — print the scenario catalog.

use strobe_conformance::catalog;

/// Runs the `strobe list` command.
pub fn run() -> Result<i32, Box<dyn std::error::Error>> {
    for scenario in catalog() {
        println!("{:>3}  {:<26} {}", scenario.number, scenario.id, scenario.title);
    }
    Ok(0)
}

use crate::catalog::{available_months, available_years};
use crate::error::Result;
use crate::fmt::pct;
use crate::settings::{data_dir, load_settings, settings_file_exists, settings_path};

pub fn run(data_dir_override: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let root = data_dir(data_dir_override);

    let saved = if settings_file_exists() { "" } else { " (not saved, run `recon-dash init`)" };
    println!("Settings:     {}{saved}", settings_path().display());
    println!("Export root:  {}", root.display());

    let p = &settings.policy;
    println!();
    println!("Match rate floor:      {}", pct(p.match_rate_floor));
    println!("One-sided threshold:   {}", pct(p.one_sided_pct));
    println!("Amount divergence:     {}", pct(p.divergence_pct));
    println!("Merchant review:       {}", pct(p.merchant_review_pct));
    println!("Unusual merchant:      {}", pct(p.unusual_merchant_pct));
    println!("Sample rows:           {}", p.sample_limit);

    println!();
    if !root.is_dir() {
        println!("Export root not found.");
        return Ok(());
    }
    let years = available_years(&root)?;
    if years.is_empty() {
        println!("No year folders found.");
    }
    for year in years {
        let months: Vec<String> = available_months(&root, year)?
            .iter()
            .map(|m| format!("{m:02}"))
            .collect();
        println!("{year}: {}", months.join(" "));
    }
    Ok(())
}

use colored::Colorize;

use crate::accounts::AccountIndex;
use crate::error::Result;
use crate::normalize::normalize;
use crate::resolver::resolve;
use crate::settings::load_settings;

pub fn run(text: &str, accounts: &str, prefixes: &[String]) -> Result<()> {
    let settings = load_settings();
    let index = AccountIndex::load(&std::fs::read(accounts)?)?;
    let result = resolve(text, &index, prefixes, &settings.fallback_code);

    println!("Input:       {text}");
    println!("Normalized:  {}", normalize(text));
    if result.is_resolved() {
        println!("Account:     {}", result.code.green().bold());
        println!("Matched:     {}", result.matched_key);
        println!("Class:       {}", result.matched_classification);
    } else {
        println!("Account:     {} (fallback)", result.code.red().bold());
    }
    println!("Match:       {}", result.match_type.label());
    Ok(())
}

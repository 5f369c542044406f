use comfy_table::{Cell, Table};

use crate::accounts::{in_scope, AccountIndex};
use crate::error::Result;
use crate::resolver::prefix_set;

pub fn list(file: &str, prefixes: &[String]) -> Result<()> {
    let index = AccountIndex::load(&std::fs::read(file)?)?;
    let prefixes = prefix_set(prefixes);

    let mut table = Table::new();
    table.set_header(vec!["Code", "Classification", "Description", "Key"]);
    let mut shown = 0usize;
    for (key, entry) in index.iter() {
        if !prefixes.is_empty() && !in_scope(&entry.classification, &prefixes) {
            continue;
        }
        table.add_row(vec![
            Cell::new(&entry.code),
            Cell::new(&entry.classification),
            Cell::new(&entry.description),
            Cell::new(key),
        ]);
        shown += 1;
    }
    println!("Accounts ({shown} of {})\n{table}", index.len());
    Ok(())
}

use comfy_table::{Cell, Table};

use crate::extractors::ALL_EXTRACTORS;

pub fn run() {
    let mut table = Table::new();
    table.set_header(vec!["Key", "Report", "Debit side", "Credit side"]);
    for kind in ALL_EXTRACTORS {
        let (debit, credit) = kind.sides();
        table.add_row(vec![
            Cell::new(kind.key()),
            Cell::new(kind.name()),
            Cell::new(debit),
            Cell::new(credit),
        ]);
    }
    println!("{table}");
    if cfg!(feature = "spreadsheet") {
        println!("Input: .csv, .xls, .xlsx");
    } else {
        println!("Input: .csv (spreadsheet support not compiled in)");
    }
}

//! Write tables to CSV.
//!
//! Missing numeric values are written as empty cells so the file reads back
//! through [`crate::io::read_table`] unchanged.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::Table;
use crate::error::Result;

/// Write `table` to a CSV file.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<()> {
    let file = File::create(path)?;
    write_table(file, table)
}

/// Write `table` as CSV to any writer.
pub fn write_table<W: Write>(output: W, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(table.column_names())?;
    for row in 0..table.n_rows() {
        writer.write_record(table.columns().map(|(_, column)| column.cell_string(row)))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;
    use crate::io::read_table;

    #[test]
    fn missing_values_become_empty_cells_and_read_back() {
        let table = Table::from_columns(vec![
            ("id".to_string(), Column::Text(vec!["a".into(), "b".into()])),
            ("y".to_string(), Column::Numeric(vec![1.5, f64::NAN])),
        ])
        .unwrap();

        let mut buf = Vec::new();
        write_table(&mut buf, &table).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "id,y\na,1.5\nb,\n");

        let back = read_table(buf.as_slice()).unwrap().table;
        assert_eq!(back.numeric("y").unwrap()[0], 1.5);
        assert!(back.numeric("y").unwrap()[1].is_nan());
    }
}

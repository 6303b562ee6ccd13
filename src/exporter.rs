use crate::record::LogRecord;

const CSV_HEADER: &str = "id,created_at,location,unit_id,refrigerant,amount";

/// Convert the raw record collection to CSV.
///
/// One row per record, newest first (the caller's snapshot order is
/// preserved). Missing optionals serialize as empty cells; commas, quotes,
/// and newlines in free-text fields are escaped by quoting.
pub fn to_csv(records: &[LogRecord]) -> String {
    let mut csv_content = String::from(CSV_HEADER);
    csv_content.push('\n');

    for record in records {
        let fields = [
            record.id.to_string(),
            record.created_at.to_rfc3339(),
            record.location.clone().unwrap_or_default(),
            record.unit_id.clone(),
            record.refrigerant.clone().unwrap_or_default(),
            record.amount.map(|a| a.to_string()).unwrap_or_default(),
        ];

        for (i, value) in fields.iter().enumerate() {
            if i > 0 {
                csv_content.push(',');
            }
            csv_content.push_str(&escape_csv(value));
        }
        csv_content.push('\n');
    }

    csv_content
}

// Quote a value when it contains a comma, quote, or newline.
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

/// Convert the raw record collection to an XLSX workbook.
///
/// Produces a single worksheet with a header row followed by one row per
/// record, saved to an in-memory buffer.
#[cfg(feature = "web")]
pub fn to_xlsx(records: &[LogRecord]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    let headers = ["ID", "Time", "Location", "Unit ID", "Refrigerant", "Amount (lbs)"];
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_number(row, 0, record.id as f64)?;
        worksheet.write_string(row, 1, record.created_at.to_rfc3339())?;
        worksheet.write_string(row, 2, record.location.clone().unwrap_or_default())?;
        worksheet.write_string(row, 3, record.unit_id.clone())?;
        worksheet.write_string(row, 4, record.refrigerant.clone().unwrap_or_default())?;
        if let Some(amount) = record.amount {
            worksheet.write_number(row, 5, amount)?;
        }
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: u64, location: Option<&str>, amount: Option<f64>) -> LogRecord {
        LogRecord {
            id,
            created_at: Utc.with_ymd_and_hms(2025, 11, 1, 12, 0, 0).unwrap(),
            location: location.map(str::to_string),
            unit_id: format!("AC-{id}"),
            refrigerant: Some("R-410A".to_string()),
            amount,
        }
    }

    #[test]
    fn csv_starts_with_the_header_row() {
        let csv = to_csv(&[]);
        assert_eq!(csv, format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn csv_has_one_row_per_record() {
        let records = vec![record(2, Some("B"), Some(2.0)), record(1, Some("A"), Some(1.0))];
        let csv = to_csv(&records);
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.lines().nth(1).unwrap().starts_with("2,"));
    }

    #[test]
    fn csv_escapes_embedded_commas_and_quotes() {
        let records = vec![record(1, Some("Main St, Suite \"B\""), Some(1.0))];
        let csv = to_csv(&records);
        assert!(csv.contains("\"Main St, Suite \"\"B\"\"\""));
    }

    #[test]
    fn csv_missing_optionals_are_empty_cells() {
        let records = vec![LogRecord {
            refrigerant: None,
            ..record(1, None, None)
        }];
        let csv = to_csv(&records);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",AC-1,,"));
    }

    #[cfg(feature = "web")]
    #[test]
    fn xlsx_produces_a_zip_container() {
        let records = vec![record(1, Some("A"), Some(1.0))];
        let bytes = to_xlsx(&records).unwrap();
        // XLSX is a zip archive; check the local-file-header magic.
        assert_eq!(&bytes[..2], b"PK");
    }
}

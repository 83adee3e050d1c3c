//! Bulk verification of a spreadsheet column.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;

use calamine::Reader;

use crate::error::{Result, VerifyError};
use crate::model::{VerificationResult, VerificationStatus};
use crate::verifier::Verifier;

pub const RESULT_COLUMNS: [&str; 5] = [
    "Verification Status",
    "Reason",
    "Score",
    "Disposable",
    "Role Based",
];

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Unique addresses sent for verification
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub risky: usize,
}

#[derive(Debug, Clone)]
pub struct EmailSheet {
    headers: csv::StringRecord,
    rows: Vec<csv::StringRecord>,
}

impl EmailSheet {
    pub fn from_reader<R: io::Read>(rdr: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
        let headers = rdr.headers()?.clone();
        let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    /// Spreadsheet files by extension, CSV otherwise.
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_workbook = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_workbook {
            Self::from_workbook(path)
        } else {
            Self::from_reader(fs_err::File::open(path)?)
        }
    }

    /// First worksheet of an Excel or OpenDocument file, its first row being the headers.
    pub fn from_workbook(path: &Path) -> Result<Self> {
        let mut workbook = calamine::open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(calamine::Error::Msg("Workbook has no worksheet"))??;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
        let headers = csv::StringRecord::from(rows.next().unwrap_or_default());
        let rows = rows.map(csv::StringRecord::from).collect();
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &csv::StringRecord {
        &self.headers
    }

    pub fn rows(&self) -> &[csv::StringRecord] {
        &self.rows
    }

    /// The named column, else the first one mentioning "email", else the first one.
    pub fn email_column(&self, name: Option<&str>) -> Result<usize> {
        if let Some(name) = name {
            return self
                .headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| VerifyError::MissingColumn(name.to_string()));
        }
        if self.headers.is_empty() {
            return Err(VerifyError::MissingColumn("email".into()));
        }
        Ok(self
            .headers
            .iter()
            .position(|h| h.to_lowercase().contains("email"))
            .unwrap_or(0))
    }

    /// Non-empty addresses of the column, first occurrence order.
    pub fn unique_emails(&self, column: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter_map(|row| row.get(column))
            .map(str::trim)
            .filter(|email| !email.is_empty() && seen.insert(email.to_string()))
            .map(String::from)
            .collect()
    }

    /// Appends the result columns to every row.
    pub fn annotate(&mut self, column: usize, results: &[VerificationResult], total: usize) -> Summary {
        let by_email = results
            .iter()
            .map(|r| (r.email.as_str(), r))
            .collect::<HashMap<_, _>>();

        let mut summary = Summary {
            total,
            ..Default::default()
        };
        self.headers.extend(RESULT_COLUMNS);
        for row in self.rows.iter_mut() {
            let result = row.get(column).and_then(|email| by_email.get(email.trim()));
            let status = result.map(|r| r.status).unwrap_or_default();
            match status {
                VerificationStatus::Valid => summary.valid += 1,
                VerificationStatus::Invalid => summary.invalid += 1,
                VerificationStatus::Risky => summary.risky += 1,
                VerificationStatus::Unknown => {}
            }
            row.push_field(&status.to_string());
            match result {
                Some(r) => {
                    row.push_field(&r.reason);
                    row.push_field(&r.score.to_string());
                    row.push_field(&r.details.is_disposable.to_string());
                    row.push_field(&r.details.is_role.to_string());
                }
                None => {
                    row.push_field("N/A");
                    row.push_field("0");
                    row.push_field("false");
                    row.push_field("false");
                }
            }
        }
        summary
    }

    pub fn write<W: io::Write>(&self, wtr: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(wtr);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Verifies the email column of `input` and writes it, annotated, to `output`.
pub async fn verify_sheet(
    verifier: &mut Verifier,
    input: &Path,
    output: &Path,
    column: Option<&str>,
) -> Result<Summary> {
    let mut sheet = EmailSheet::from_path(input)?;
    let column = sheet.email_column(column)?;
    let emails = sheet.unique_emails(column);
    log::info!("Processing {} unique emails", emails.len());

    let results = verifier.verify_many(&emails, "Bulk").await;
    let summary = sheet.annotate(column, &results, emails.len());
    sheet.write(fs_err::File::create(output)?)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VerificationDetails;

    const SHEET: &str = "Name,Work Email,City\n\
                         Smile,info@smiledental.in,Vadodara\n\
                         Care,care@clinic.in,Pune\n\
                         Smile again,info@smiledental.in,Vadodara\n\
                         Nobody,,Pune\n";

    fn result(email: &str, status: VerificationStatus) -> VerificationResult {
        VerificationResult {
            email: email.into(),
            status,
            score: 0.9,
            reason: "ok".into(),
            details: VerificationDetails {
                is_role: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn picks_the_email_column() {
        let sheet = EmailSheet::from_reader(SHEET.as_bytes()).unwrap();
        assert_eq!(sheet.email_column(None).unwrap(), 1);
        assert_eq!(sheet.email_column(Some("City")).unwrap(), 2);
        assert!(matches!(
            sheet.email_column(Some("Mail")),
            Err(VerifyError::MissingColumn(_))
        ));

        let sheet = EmailSheet::from_reader("Name,Contact\na,b@c.co\n".as_bytes()).unwrap();
        assert_eq!(sheet.email_column(None).unwrap(), 0);
    }

    #[test]
    fn unique_non_empty_emails() {
        let sheet = EmailSheet::from_reader(SHEET.as_bytes()).unwrap();
        assert_eq!(
            sheet.unique_emails(1),
            vec!["info@smiledental.in", "care@clinic.in"]
        );

        let sheet = EmailSheet::from_reader("Email\n a@b.co \na@b.co\n\n".as_bytes()).unwrap();
        assert_eq!(sheet.unique_emails(0), vec!["a@b.co"]);
    }

    #[test]
    fn reads_the_first_worksheet() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/leads.xlsx");
        let sheet = EmailSheet::from_path(&path).unwrap();

        assert_eq!(sheet.headers(), &csv::StringRecord::from(vec!["Business", "Email", "Rating"]));
        assert_eq!(sheet.rows().len(), 3);
        assert_eq!(&sheet.rows()[0], &csv::StringRecord::from(vec!["Smile", "good@smile.in", "4.5"]));
        assert_eq!(&sheet.rows()[2], &csv::StringRecord::from(vec!["Nobody", "", "3"]));
        assert_eq!(sheet.email_column(None).unwrap(), 1);
        assert_eq!(sheet.unique_emails(1), vec!["good@smile.in", "info@care.in"]);
    }

    #[test]
    fn workbook_that_is_not_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.XLSX");
        fs_err::write(&path, "Email\na@b.co\n").unwrap();
        assert!(matches!(EmailSheet::from_path(&path), Err(VerifyError::Workbook(_))));
    }

    #[test]
    fn annotates_rows_and_summarizes() {
        let mut sheet = EmailSheet::from_reader(SHEET.as_bytes()).unwrap();
        let results = vec![result("info@smiledental.in", VerificationStatus::Valid)];

        let summary = sheet.annotate(1, &results, 2);

        assert_eq!(
            summary,
            Summary {
                total: 2,
                valid: 2,
                invalid: 0,
                risky: 0
            }
        );
        let mut out = vec![];
        sheet.write(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Name,Work Email,City,Verification Status,Reason,Score,Disposable,Role Based\n\
             Smile,info@smiledental.in,Vadodara,Valid,ok,0.9,false,true\n\
             Care,care@clinic.in,Pune,Unknown,N/A,0,false,false\n\
             Smile again,info@smiledental.in,Vadodara,Valid,ok,0.9,false,true\n\
             Nobody,,Pune,Unknown,N/A,0,false,false\n"
        );
    }
}

use std::io;
use std::path::Path;
use std::thread;

use crossbeam_channel::{unbounded, Sender};
use serde::{Deserialize, Serialize};

use crate::listing::Listing;
use crate::pipeline::ListingPipeline;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsvWriterConfig {
    #[serde(default = "default_csv_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub escape: Option<char>,
    #[serde(default = "default_csv_terminator")]
    pub terminator: CsvTerminator,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            escape: None,
            terminator: CsvTerminator::Any('\n'),
        }
    }
}

fn default_csv_delimiter() -> char {
    CsvWriterConfig::default().delimiter
}

fn default_csv_terminator() -> CsvTerminator {
    CsvWriterConfig::default().terminator
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum CsvTerminator {
    CRLF,
    Any(char),
}

impl From<CsvTerminator> for csv::Terminator {
    fn from(source: CsvTerminator) -> Self {
        match source {
            CsvTerminator::CRLF => Self::CRLF,
            CsvTerminator::Any(c) => Self::Any(c as u8),
        }
    }
}

impl From<&CsvWriterConfig> for csv::WriterBuilder {
    fn from(c: &CsvWriterConfig) -> Self {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(c.delimiter as u8);
        builder.terminator(c.terminator.into());
        if let Some(escape) = c.escape {
            builder.double_quote(false);
            builder.escape(escape as u8);
        } else {
            builder.double_quote(true);
        }
        builder
    }
}

pub enum CsvWriter {
    File(csv::Writer<fs_err::File>),
    Stdout(csv::Writer<io::Stdout>),
}

impl CsvWriter {
    pub fn open(path: Option<&Path>, config: &CsvWriterConfig) -> anyhow::Result<Self> {
        let builder = csv::WriterBuilder::from(config);
        Ok(match path {
            Some(path) => Self::File(builder.from_writer(fs_err::File::create(path)?)),
            None => Self::Stdout(builder.from_writer(io::stdout())),
        })
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::File(wtr) => wtr.flush(),
            Self::Stdout(wtr) => wtr.flush(),
        }
    }

    pub fn serialize(&mut self, listing: &Listing) -> csv::Result<()> {
        match self {
            Self::File(wtr) => wtr.serialize(listing),
            Self::Stdout(wtr) => wtr.serialize(listing),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    pub dropped: usize,
}

/// Spawns the thread running listings through the pipeline into the CSV output.
///
/// The thread ends, flushing the output, once every sender is dropped.
pub fn spawn_writer(
    path: Option<&Path>,
    config: &CsvWriterConfig,
) -> anyhow::Result<(Sender<Listing>, thread::JoinHandle<anyhow::Result<WriteReport>>)> {
    let mut wtr = CsvWriter::open(path, config)?;
    let (tx_listing, rx_listing) = unbounded::<Listing>();

    let handle = thread::Builder::new()
        .name("csv-writer".into())
        .spawn(move || {
            let mut pipeline = ListingPipeline::default();
            let mut report = WriteReport::default();
            for listing in rx_listing {
                match pipeline.process(listing) {
                    Some(listing) => match wtr.serialize(&listing) {
                        Ok(()) => report.written += 1,
                        Err(e) => log::error!("Couldn't write listing {}: {e}", listing.label()),
                    },
                    None => report.dropped += 1,
                }
            }
            wtr.flush()?;
            Ok(report)
        })?;

    Ok((tx_listing, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(name: &str, phone: Option<&str>, email: Option<&str>) -> Listing {
        Listing {
            business_name: Some(name.into()),
            phone_number: phone.map(String::from),
            address: Some("Gotri, Vadodara".into()),
            website_url: None,
            email: email.map(String::from),
            place_url: Some(format!("https://maps.test/place/{name}")),
        }
    }

    #[test]
    fn writes_deduplicated_listings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let (tx, handle) = spawn_writer(Some(&path), &CsvWriterConfig::default()).unwrap();
        tx.send(listing("Smile", Some("98765 43210"), Some("a@smile.in, b@smile.in")))
            .unwrap();
        tx.send(listing("Smile again", Some("9876543210"), None)).unwrap();
        tx.send(listing("Care", None, None)).unwrap();
        drop(tx);
        let report = handle.join().unwrap().unwrap();

        assert_eq!(
            report,
            WriteReport {
                written: 2,
                dropped: 1
            }
        );
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "business_name,phone_number,address,website_url,email,place_url\n\
             Smile,9876543210,\"Gotri, Vadodara\",,\"a@smile.in, b@smile.in\",https://maps.test/place/Smile\n\
             Care,,\"Gotri, Vadodara\",,,https://maps.test/place/Care\n"
        );
    }

    #[test]
    fn custom_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let config: CsvWriterConfig = serde_json::from_str(r#"{"delimiter": ";"}"#).unwrap();

        let (tx, handle) = spawn_writer(Some(&path), &config).unwrap();
        tx.send(listing("Care", None, None)).unwrap();
        drop(tx);
        handle.join().unwrap().unwrap();

        let out = std::fs::read_to_string(&path).unwrap();
        assert!(out.starts_with("business_name;phone_number;address;"));
        assert!(out.contains("Care;;Gotri, Vadodara;;;"));
    }
}

//! Query command.

use console::style;

use crate::client::ArchiveClient;
use crate::config::Settings;
use crate::query::{OutputFormat, QueryError, QueryFilters, QueryParams};

use super::helpers::render_table;

#[derive(Debug, clap::Args)]
pub struct QueryArgs {
    /// Instrument name (e.g. mag)
    #[arg(long)]
    instrument: Option<String>,

    /// Data level of the product (e.g. l1a)
    #[arg(long)]
    data_level: Option<String>,

    /// Descriptor of the product (e.g. burst)
    #[arg(long)]
    descriptor: Option<String>,

    /// Files with a start date on or after this date (YYYYMMDD or YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<String>,

    /// Files with a start date on or before this date (YYYYMMDD or YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<String>,

    /// Repointing number (e.g. 12 or repoint00012)
    #[arg(long)]
    repointing: Option<String>,

    /// Data version (vNNN), or 'latest' for the newest version of each product
    #[arg(long)]
    version: Option<String>,

    /// File extension (pkts or cdf)
    #[arg(long)]
    extension: Option<String>,

    /// Query using the fields of a science filename; cannot be combined with other filters
    #[arg(long)]
    filename: Option<String>,

    /// How to print the results
    #[arg(long, value_enum, default_value = "table")]
    output_format: OutputFormat,
}

impl QueryArgs {
    /// Validate the arguments into request parameters.
    pub fn into_params(self) -> Result<QueryParams, QueryError> {
        let output_format = self.output_format;
        let filters = match self.filename {
            Some(ref filename) => {
                let others = [
                    &self.instrument,
                    &self.data_level,
                    &self.descriptor,
                    &self.start_date,
                    &self.end_date,
                    &self.repointing,
                    &self.version,
                    &self.extension,
                ];
                if others.iter().any(|v| v.is_some()) {
                    return Err(QueryError::FilenameWithFilters);
                }
                QueryFilters::from_filename(filename)?
            }
            None => QueryFilters {
                instrument: self.instrument,
                data_level: self.data_level,
                descriptor: self.descriptor,
                start_date: self.start_date,
                end_date: self.end_date,
                repointing: self.repointing,
                version: self.version,
                extension: self.extension,
                output_format,
            },
        };
        QueryParams::normalize(&QueryFilters {
            output_format,
            ..filters
        })
    }
}

/// Query the archive and print the matching files.
pub async fn cmd_query(settings: &Settings, params: &QueryParams) -> anyhow::Result<()> {
    let client = ArchiveClient::new(settings)?;
    let listing = client.query(params).await?;

    for error in &listing.errors {
        eprintln!("{} {}", style("!").yellow(), error);
    }

    match params.output_format() {
        OutputFormat::Table => print!("{}", render_table(&listing.records)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing.records)?),
    }

    if !listing.is_clean() {
        eprintln!(
            "{} {} listing entries did not follow the naming convention",
            style("!").yellow(),
            listing.errors.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: QueryArgs,
    }

    fn parse(list: &[&str]) -> QueryArgs {
        let mut argv = vec!["query"];
        argv.extend_from_slice(list);
        Harness::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_filters_to_params() {
        let params = parse(&["--instrument", "swe", "--data-level", "l0", "--output-format", "json"])
            .into_params()
            .unwrap();
        assert_eq!(params.query_string(), "instrument=swe&data_level=l0");
        assert_eq!(params.output_format(), OutputFormat::Json);
    }

    #[test]
    fn test_filename_must_be_alone() {
        let err = parse(&[
            "--filename",
            "imap_swe_l0_sci_20240105_v001.pkts",
            "--instrument",
            "swe",
        ])
        .into_params()
        .unwrap_err();
        assert!(matches!(err, QueryError::FilenameWithFilters));

        let params = parse(&["--filename", "imap_swe_l0_sci_20240105_v001.pkts"])
            .into_params()
            .unwrap();
        assert_eq!(params.get("version"), Some("v001"));
        assert_eq!(params.get("extension"), Some("pkts"));
    }

    #[test]
    fn test_no_filters_rejected() {
        assert!(matches!(
            parse(&[]).into_params(),
            Err(QueryError::NoFilters)
        ));
    }
}

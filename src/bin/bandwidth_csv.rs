use anyhow::Result;
use ceilometer::{cli::ConnectionOptions, dump, sink::CsvSink};
use log::info;
use std::path::PathBuf;
use structopt::StructOpt;

/// Dump daily ceilometer bandwidth totals to a csv file.
#[derive(StructOpt)]
struct Options {
    #[structopt(flatten)]
    connection: ConnectionOptions,
    /// Number of days to include in the csv, counting back from today
    #[structopt(long, default_value = "1")]
    days: u32,
    /// Name of the output csv file
    #[structopt(parse(from_os_str))]
    filename: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load from .env file if it is present
    dotenv::dotenv().ok();
    // Initialize logging
    env_logger::init();
    // Get command line arguments
    let options = Options::from_args();
    let client = options.connection.client()?;
    let mut sink = CsvSink::create(&options.filename, dump::BANDWIDTH_FIELDS)?;
    let rows = dump::dump_bandwidth(&client, &mut sink, options.days).await?;
    sink.flush()?;
    info!("{} rows for {} days written to {}", rows, options.days, options.filename.display());
    Ok(())
}

use anyhow::Result;
use ceilometer::{cli::ConnectionOptions, dump, sink::CsvSink};
use log::info;
use std::path::PathBuf;
use structopt::StructOpt;

/// Dump ceilometer resource data to a csv file.
#[derive(StructOpt)]
struct Options {
    #[structopt(flatten)]
    connection: ConnectionOptions,
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
    let mut sink = CsvSink::create(&options.filename, dump::RESOURCE_FIELDS)?;
    let rows = dump::dump_resources(&client, &mut sink).await?;
    sink.flush()?;
    info!("{} rows written to {}", rows, options.filename.display());
    Ok(())
}

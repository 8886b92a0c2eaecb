use anyhow::Result;
use ceilometer::{cli::ConnectionOptions, dump, sink::CsvSink};
use log::info;
use std::path::PathBuf;
use structopt::StructOpt;

/// Dump ceilometer instance data to a csv file.
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
    dotenv::dotenv().ok();
    env_logger::init();
    let options = Options::from_args();
    let client = options.connection.client()?;
    let mut sink = CsvSink::create(&options.filename, dump::INSTANCE_FIELDS)?;
    let rows = dump::dump_instances(&client, &mut sink).await?;
    sink.flush()?;
    info!("{} rows written to {}", rows, options.filename.display());
    Ok(())
}

use anyhow::Result;
use std::{env, fs::File, path::Path};
use bank_slip_processor::{Config, process, setup_logging};

fn main() -> Result<()> {
    let config = Config::from_env()?;
    setup_logging(config.log_format)?;

    let (file_name, reader) = get_reader()?;
    let writer = get_writer();

    let mut wtr = csv::Writer::from_writer(writer);
    for record in process(reader, &file_name, &config)? {
        wtr.serialize(&record)?;
    }
    wtr.flush()?;

    Ok(())
}

fn get_reader() -> Result<(String, impl std::io::Read)> {
    let path = env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Usage: bank-slip-processor <debts.csv>"))?;
    let file = File::open(&path)?;
    let file_name = Path::new(&path)
        .file_name()
        .map_or_else(|| path.clone(), |name| name.to_string_lossy().into_owned());
    Ok((file_name, file))
}

fn get_writer() -> impl std::io::Write {
    std::io::stdout()
}

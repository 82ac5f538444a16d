use std::io::Write;

use chain_directory::Directory;
use chain_directory::Entry;
use clap::Parser;
use env_logger::Builder;
use env_logger::Target;
use log::LevelFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Initial number of buckets.
    #[arg(short = 'c', long = "capacity", default_value_t = 8)]
    capacity: usize,

    /// Size-to-bucket ratio at which the directory doubles.
    #[arg(short = 'l', long = "load-factor", default_value_t = 0.75)]
    load_factor: f32,
}

fn init_logger() {
    let mut builder = Builder::new();

    // Growth notices share stdout with the listing, bare like the rest.
    builder
        .filter_level(LevelFilter::Info)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .target(Target::Stdout)
        .parse_default_env();

    let _ = builder.try_init();
}

fn main() -> Result<(), chain_directory::Error> {
    init_logger();
    let args = Args::parse();

    let mut directory = Directory::with_capacity_and_load_factor(args.capacity, args.load_factor)?;

    directory.insert(Entry::new("John Snow", "+485327095"));
    directory.insert(Entry::new("Mike Tayson", "+235236231"));
    directory.insert(Entry::new("gsdgsdgsd", "+235236231"));
    directory.insert(Entry::new("532fwef32fe", "+235236231"));
    directory.insert(Entry::new("f23fs23fsefs", "+235236231"));

    directory.remove("532fwef32fe");
    directory.lookup("532fwef32fe").print();
    directory.display().print();

    Ok(())
}

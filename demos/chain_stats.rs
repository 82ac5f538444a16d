use chain_directory::Directory;
use chain_directory::Entry;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Number of entries to insert.
    #[arg(short = 'n', long = "entries", default_value_t = 1000)]
    entries: usize,

    /// Initial number of buckets.
    #[arg(short = 'c', long = "capacity", default_value_t = 8)]
    capacity: usize,

    /// Size-to-bucket ratio at which the directory doubles.
    #[arg(short = 'l', long = "load-factor", default_value_t = 0.75)]
    load_factor: f32,
}

fn main() -> Result<(), chain_directory::Error> {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .format_timestamp_millis()
        .parse_default_env();
    let _ = builder.try_init();

    let args = Args::parse();

    println!(
        "Creating Directory with {} buckets and load factor {}",
        args.capacity, args.load_factor
    );

    let mut directory = Directory::with_capacity_and_load_factor(args.capacity, args.load_factor)?;

    println!("Filling directory with {} entries...", args.entries);
    for i in 0..args.entries {
        directory.insert(Entry::new(
            format!("person {i}"),
            format!("+{:09}", i.wrapping_mul(2_654_435_761) % 1_000_000_000),
        ));
    }

    println!("Inserted {} entries into directory", directory.len());
    println!(
        "Final buckets: {}, next growth at {} entries",
        directory.capacity(),
        directory.threshold()
    );
    println!(
        "Final load factor: {:.2}%",
        (directory.len() as f64 / directory.capacity() as f64) * 100.0
    );

    directory.print_chain_histogram();
    directory.debug_stats().print();

    let removed = (0..args.entries)
        .step_by(2)
        .filter(|i| directory.remove(&format!("person {i}")).is_some())
        .count();
    println!("Removed {removed} entries, {} remain", directory.len());
    directory.debug_stats().print();

    Ok(())
}

fn main() {
    if let Err(err) = csv_harvester::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

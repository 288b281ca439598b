fn main() {
    if let Err(err) = csv_recast::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

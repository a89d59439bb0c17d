fn main() {
    if let Err(err) = sheet_migrate::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

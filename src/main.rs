fn main() {
    if let Err(err) = scopeviz::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn main() {
    if let Err(err) = argmap::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

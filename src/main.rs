fn main() {
    if let Err(e) = clinicdesk::run() {
        eprintln!("clinicdesk: {e}");
        std::process::exit(1);
    }
}

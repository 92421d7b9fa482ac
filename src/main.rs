fn main() {
    if let Err(err) = folio::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

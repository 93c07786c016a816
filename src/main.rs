fn main() {
    if let Err(err) = chart_labeler::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

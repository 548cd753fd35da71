use clap::Parser;

fn main() {
    let args = clipmon::Args::parse();
    if let Err(e) = clipmon::run(args) {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

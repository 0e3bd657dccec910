use nomikai::config::load_settings;
use nomikai::runtime::run_bot;
use std::sync::atomic::AtomicBool;

static STOP: AtomicBool = AtomicBool::new(false);

fn run() -> Result<(), String> {
    // A missing .env is normal; the process environment still applies.
    let _ = dotenvy::dotenv();
    let settings = load_settings().map_err(|err| err.to_string())?;
    run_bot(&settings, &STOP).map_err(|err| err.to_string())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

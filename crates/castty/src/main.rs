mod cli;
mod commands;

fn main() {
    let app = cli::build_cli();
    let matches = app.get_matches();

    let verbose = matches.get_flag("verbose");
    castty_core::init_logging(verbose);

    let result = match matches.subcommand() {
        Some(("record", sub)) => commands::record::handle(sub),
        Some(("playback", sub)) => commands::playback::handle(sub),
        Some(("monitor-connect", sub)) => commands::monitor_connect::handle(sub),
        _ => unreachable!("clap requires a subcommand"),
    };

    if let Err(e) = result {
        // Already reported to the user via eprintln! in the handler;
        // exit non-zero without printing the Debug representation.
        drop(e);
        std::process::exit(1);
    }
}

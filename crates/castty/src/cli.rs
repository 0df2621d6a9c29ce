use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("castty")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Record, replay, and monitor terminal sessions")
        .long_about(
            "castty records a terminal session to a portable cast file, replays it back at \
             the original (or sped-up) pace, and can fan recordings out live to a browser-based \
             monitor while recording is still in progress.",
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(record_command())
        .subcommand(playback_command())
        .subcommand(monitor_connect_command())
}

fn record_command() -> Command {
    Command::new("record")
        .about("Record a terminal session to a cast file")
        .arg(
            Arg::new("shell")
                .long("shell")
                .value_name("PATH")
                .help("Shell to record (defaults to $SHELL, falling back to /bin/sh)"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("PATH")
                .help("Cast file path (defaults to recording_<timestamp>.cast in the current directory)"),
        )
        .arg(
            Arg::new("monitor")
                .long("monitor")
                .help("Serve a live browser-based monitor while recording")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("monitor-host")
                .long("monitor-host")
                .value_name("HOST")
                .help("Monitor bind host (default: localhost)"),
        )
        .arg(
            Arg::new("monitor-port")
                .long("monitor-port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .help("Monitor page-server port; the push endpoint binds to port+1 (default: 8888)"),
        )
        .arg(
            Arg::new("monitor-buffer-size")
                .long("monitor-buffer-size")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .help("Number of output/error events replayed to a newly attached viewer (default: 1000)"),
        )
}

fn playback_command() -> Command {
    Command::new("playback")
        .about("Replay a recorded cast file")
        .arg(
            Arg::new("cast-file")
                .required(true)
                .value_name("CAST_FILE")
                .help("Path to the .cast file to replay"),
        )
        .arg(
            Arg::new("speed")
                .long("speed")
                .value_name("FACTOR")
                .value_parser(clap::value_parser!(f64))
                .help("Playback speed multiplier (default: 1.0)"),
        )
        .arg(
            Arg::new("max-delay")
                .long("max-delay")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(f64))
                .help("Cap on the delay between any two events, after applying --speed (default: 5.0)"),
        )
        .arg(
            Arg::new("play-in-terminal")
                .long("play-in-terminal")
                .action(ArgAction::SetTrue)
                .hide(true)
                .help("Internal: play inline instead of spawning a new terminal window"),
        )
}

fn monitor_connect_command() -> Command {
    Command::new("monitor-connect")
        .about("Open a browser against a running monitor front-end")
        .arg(
            Arg::new("url")
                .required(true)
                .value_name("URL")
                .help("Monitor page-server URL, e.g. http://localhost:8888"),
        )
        .arg(
            Arg::new("browser")
                .long("browser")
                .value_name("NAME")
                .help("Browser to launch (defaults to the system default)"),
        )
        .arg(
            Arg::new("no-open")
                .long("no-open")
                .action(ArgAction::SetTrue)
                .help("Print the URL instead of launching a browser"),
        )
}

use clap::{arg, Command};

pub fn get_args() -> Command {
    Command::new("fsman")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg_required_else_help(true)
        .arg(arg!(<DEVICE_URL> "Base URL of the device, e.g. http://192.168.4.1"))
        .arg(arg!(-o --"download-dir" [DIR] "Directory downloaded files are saved to").default_value("."))
        .arg(arg!(--"log-file" [FILE] "Diagnostic log file").default_value("fsman.log"))
        .arg(arg!(-v --debug "Print debug information"))
}

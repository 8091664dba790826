fn main() {
    std::process::exit(ac_cli::run_cli_from_args(std::env::args_os()));
}

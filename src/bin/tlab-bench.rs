use tlab_bench::frontend;

fn main() {
    std::process::exit(frontend::cli_main());
}

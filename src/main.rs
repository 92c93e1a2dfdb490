fn main() {
    dut_cases::cli::run();
}

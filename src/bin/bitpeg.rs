fn main() {
    bitpeg::cli::run();
}

fn main() -> anyhow::Result<()> {
    tally_cli::run(std::env::args())
}

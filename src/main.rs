fn main() -> anyhow::Result<()> {
    lmp::app::run()
}

fn main() -> anyhow::Result<()> {
    beacon::run()
}

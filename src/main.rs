fn main() -> anyhow::Result<()> {
    pixel_room::run()
}

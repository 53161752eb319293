fn main() -> anyhow::Result<()>
{
        visualizer_host::run()
}

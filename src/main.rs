// Fretsense command line entry point

fn main() -> anyhow::Result<()> {
    fretsense_lib::run()
}

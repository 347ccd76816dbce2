mod command;
mod logging;
mod schema;
mod util;

fn main() -> anyhow::Result<()> {
    logging::init()?;
    command::run()
}

pub mod app;
pub mod renderer;

use color_eyre::Result;
use app::App;
use renderer::ContextApi;
use renderer::config::RenderConfig;

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let api = ContextApi::from_args(std::env::args().skip(1));
    let app = App::new(api, RenderConfig::default());
    app.run()?;

    Ok(())
}

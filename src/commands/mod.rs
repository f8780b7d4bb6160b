mod info;
mod mosaic;
mod overlay;

pub use info::Info;
pub use mosaic::Mosaic;
pub use overlay::Overlay;

pub trait Command {
    fn identifier(&self) -> &'static str;
    fn register(&self) -> clap::App<'static>;
    fn run(&self, args: &clap::ArgMatches) -> anyhow::Result<()>;
}

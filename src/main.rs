mod actions;
mod cli;
mod config;
mod debounce;
mod dispatch;
mod gestures;
mod landmarks;
mod logging;
mod pipeline;
mod session;
mod smoothing;
mod source;
mod watch;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}

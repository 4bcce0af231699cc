use clap::Parser;

#[derive(Parser)]
#[command(version, about = "Resolve transport configs into dialer recipes", long_about = None)]
pub struct Args {
    #[arg(short, long, help = "Transport config, accept file path, URL or inline config")]
    pub config: String,

    #[arg(short, long, help = "Emit debug log")]
    pub verbose: bool,

    #[arg(short, long, help = "Pretty-print the resolved recipe")]
    pub pretty: bool,
}

use clap::Parser as ClapParser;
use gopiler_drv::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match gopiler_drv::run(&cli) {
        Ok(results) => {
            for result in &results {
                if let Some(image) = &result.image {
                    tracing::debug!(
                        program = result.program_num,
                        "machine image:\n{}",
                        image.to_hex_display()
                    );
                }
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

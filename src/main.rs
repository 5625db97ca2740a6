use anyhow::Result;
use clap::Parser;
use semtagger::{arguments::Arguments, git::GitTracker, release};

fn main() -> Result<()> {
    let args = Arguments::parse();
    pretty_env_logger::env_logger::builder()
        .filter_level(args.log_level())
        .format_timestamp(None)
        .parse_default_env()
        .init();

    log::debug!("Arguments: {:?}", args);
    let config = args.release_config()?;

    let repository = GitTracker::open(&args.path)?;
    let outcome = release::run(&repository, &config)?;

    // The tag is the program's output, regardless of verbosity
    println!("{}", outcome.tag);

    if outcome.pushed {
        log::info!("Done! Created and pushed {}", outcome.tag);
    } else if outcome.created {
        log::info!("Done! Created {}", outcome.tag);
    }
    Ok(())
}

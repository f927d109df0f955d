use clap::Parser;
use geocode_prep::cli::{self, Args};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    let Some(command) = args.command else {
        show_help_and_commands();
        process::exit(0);
    };

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    match runtime.block_on(cli::run(command)) {
        Ok(true) => process::exit(0),
        // Ran to completion, but at least one source or query failed
        Ok(false) => process::exit(1),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("Geocode Prep - Reference Lookup Table Builder");
    println!("=============================================");
    println!();
    println!("Convert raw postal, rail station and airport registries into");
    println!("code-keyed latitude/longitude lookup tables for the emissions dashboard.");
    println!();
    println!("USAGE:");
    println!("    geocode_prep <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    prepare     Build the insee, uic, tvs and iata lookup artifacts");
    println!("    lookup      Print the coordinates of one code from an artifact");
    println!("    structure   Print the emissions rows of one structure");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Prepare every source from the default directories:");
    println!("    geocode_prep prepare");
    println!();
    println!("    # Prepare two sources as parquet with custom paths:");
    println!("    geocode_prep prepare --raw-dir /path/to/raw --prepared-dir /path/to/prepared \\");
    println!("                         --sources uic,iata --format parquet");
    println!();
    println!("    # Query a prepared lookup:");
    println!("    geocode_prep lookup insee 75114");
    println!();
    println!("For detailed help on any command, use:");
    println!("    geocode_prep <COMMAND> --help");
}

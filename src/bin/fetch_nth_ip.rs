use clap::Parser;

use kpi_feed::net::nth_address;

#[derive(Parser)]
#[command(name = "fetch-nth-ip")]
#[command(about = "Return the Nth address from a network.")]
struct Cli {
    /// Network in CIDR notation, e.g. 192.168.1.0/24 or 2001:db8::/64
    subnet: String,

    /// Offset from the first address
    #[arg(allow_negative_numbers = true)]
    offset: i64,
}

fn main() {
    let cli = Cli::parse();
    match nth_address(&cli.subnet, cli.offset) {
        Ok(ip) => println!("{ip}"),
        Err(err) => {
            eprintln!("ERROR: {err}");
            std::process::exit(1);
        }
    }
}

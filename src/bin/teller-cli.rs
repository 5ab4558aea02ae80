use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "teller-cli")]
#[command(about = "Client for the teller-proxy API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:7071")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind a skycoin address to a new BTC deposit address
    Bind {
        /// Skycoin address receiving the coins
        skyaddr: String,
    },
    /// Show deposit statuses for a skycoin address
    Status {
        /// Skycoin address to look up
        skyaddr: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Bind { skyaddr } => {
            client
                .post(format!("{}/api/bind", base))
                .json(&json!({ "skyaddr": skyaddr }))
                .send()
                .await?
        }
        Commands::Status { skyaddr } => {
            client
                .get(format!("{}/api/status", base))
                .query(&[("skyaddr", skyaddr)])
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: teller-proxy returned status {}", status);
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => eprintln!("{}", serde_json::to_string_pretty(&body)?),
            Err(_) => eprintln!("Response: {}", text),
        }
        std::process::exit(1);
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

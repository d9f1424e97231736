//! Command-line client that exercises every calculator and greet operation.

use clap::{Parser, Subcommand, ValueEnum};
use core::time::Duration;
use futures::{Stream, StreamExt};
use quadrant_core::{
    Error, ErrorKind,
    client::{Calculator, Greeter, ResultStream, connect},
};
use tonic::codec::CompressionEncoding;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "quadrant-client",
    version,
    about = "Demo client for the quadrant calculator and greet services"
)]
struct Cli {
    /// Server URL.
    ///
    /// Environment variable: `QUADRANT_ADDR`
    #[arg(long, global = true, env = "QUADRANT_ADDR", default_value = "http://127.0.0.1:50051")]
    addr: String,

    /// Compress requests and accept compressed responses.
    #[arg(long, global = true, value_enum)]
    compression: Option<Compression>,

    /// Pause between two outbound stream messages, in milliseconds.
    #[arg(long, global = true, default_value_t = 0)]
    interval_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Compression {
    Zstd,
    Gzip,
    Deflate,
}

impl From<Compression> for CompressionEncoding {
    fn from(value: Compression) -> Self {
        match value {
            Compression::Zstd => Self::Zstd,
            Compression::Gzip => Self::Gzip,
            Compression::Deflate => Self::Deflate,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add two numbers.
    Sum {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
    },
    /// Square root of a number; negative numbers are rejected.
    Sqrt {
        #[arg(allow_negative_numbers = true)]
        number: i32,
    },
    /// Stream the prime factors of a number.
    Factors {
        #[arg(allow_negative_numbers = true)]
        n: i64,
    },
    /// Stream numbers and print their average.
    Average {
        #[arg(allow_negative_numbers = true)]
        values: Vec<i32>,
    },
    /// Stream numbers and print each new maximum as it is reported.
    Max {
        #[arg(allow_negative_numbers = true)]
        values: Vec<i32>,
    },
    /// Greet someone once.
    Greet {
        first_name: String,
        #[arg(default_value = "")]
        last_name: String,
    },
    /// Greet with a time budget; the server takes about two seconds.
    GreetDeadline {
        first_name: String,
        /// Time budget in milliseconds.
        #[arg(long, default_value_t = 5000)]
        budget_ms: u64,
    },
    /// Receive a stream of numbered greetings.
    GreetMany {
        first_name: String,
        #[arg(default_value = "")]
        last_name: String,
    },
    /// Stream first names and print the combined greeting.
    LongGreet { names: Vec<String> },
    /// Stream first names and print each greeting as it comes back.
    GreetEveryone { names: Vec<String> },
}

fn paced<T>(items: Vec<T>, interval: Duration) -> impl Stream<Item = T> + Send + 'static
where
    T: Send + 'static,
{
    futures::stream::iter(items).then(move |item| async move {
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
        item
    })
}

async fn print_stream<T>(mut stream: ResultStream<T>) -> quadrant_core::Result<()>
where
    T: core::fmt::Display + 'static,
{
    while let Some(item) = stream.next().await {
        println!("{}", item?);
    }
    Ok(())
}

async fn run(cli: Cli) -> quadrant_core::Result<()> {
    let channel = connect(cli.addr).await?;
    let interval = Duration::from_millis(cli.interval_ms);
    let encoding = cli.compression.map(CompressionEncoding::from);

    let mut calc = Calculator::new(channel.clone());
    let mut greeter = Greeter::new(channel);
    if let Some(encoding) = encoding {
        calc = calc.compressed(encoding);
        greeter = greeter.compressed(encoding);
    }

    match cli.command {
        Command::Sum { x, y } => println!("{}", calc.sum(x, y).await?),
        Command::Sqrt { number } => println!("{}", calc.square_root(number).await?),
        Command::Factors { n } => print_stream(calc.prime_factors(n).await?).await?,
        Command::Average { values } => {
            println!("{}", calc.average(paced(values, interval)).await?);
        }
        Command::Max { values } => {
            print_stream(calc.running_max(paced(values, interval)).await?).await?;
        }
        Command::Greet {
            first_name,
            last_name,
        } => println!("{}", greeter.greet(&first_name, &last_name).await?),
        Command::GreetDeadline {
            first_name,
            budget_ms,
        } => {
            let budget = Duration::from_millis(budget_ms);
            let result = greeter
                .greet_with_deadline(&first_name, "", budget)
                .await?;
            println!("{result}");
        }
        Command::GreetMany {
            first_name,
            last_name,
        } => print_stream(greeter.greet_many_times(&first_name, &last_name).await?).await?,
        Command::LongGreet { names } => {
            println!("{}", greeter.long_greet(paced(names, interval)).await?);
        }
        Command::GreetEveryone { names } => {
            print_stream(greeter.greet_everyone(paced(names, interval)).await?).await?;
        }
    }

    Ok(())
}

fn report(err: &Error) {
    match err.kind() {
        ErrorKind::InvalidArgument => eprintln!("Rejected by the server: {err}"),
        ErrorKind::DeadlineExceeded => eprintln!("Deadline was exceeded: {err}"),
        ErrorKind::Cancelled => eprintln!("Call was cancelled: {err}"),
        ErrorKind::Unavailable => eprintln!("Server unavailable: {err}"),
        ErrorKind::Internal => eprintln!("Server error: {err}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "Parsed arguments");

    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
    Ok(())
}

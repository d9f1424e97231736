use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `quadrant-server` binary.
///
/// These settings control buffering, the pacing of the greet streams, the
/// artificial latency of `GreetWithDeadline` and how long shutdown waits for
/// in-flight calls. All values are parsed from CLI arguments or environment
/// variables (a `.env` file is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "quadrant-server",
    version,
    about = "A gRPC calculator and greet service covering all four call shapes"
)]
pub struct CliArgs {
    /// Capacity of the per-call response buffer for streaming calls.
    ///
    /// A producer waits once this many messages are queued and unread, so a
    /// slow client applies backpressure instead of growing server memory.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Number of greetings sent by `GreetManyTimes`.
    ///
    /// Environment variable: `GREET_REPEAT_COUNT`
    #[arg(long, env = "GREET_REPEAT_COUNT", default_value_t = 10)]
    pub greet_repeat_count: u32,

    /// Pause between two `GreetManyTimes` messages, in milliseconds.
    ///
    /// Environment variable: `GREET_INTERVAL_MS`
    #[arg(long, env = "GREET_INTERVAL_MS", default_value_t = 1000)]
    pub greet_interval_ms: u64,

    /// Simulated work time of `GreetWithDeadline`, in milliseconds.
    ///
    /// Environment variable: `SLOW_GREETING_MS`
    #[arg(long, env = "SLOW_GREETING_MS", default_value_t = 2000)]
    pub slow_greeting_ms: u64,

    /// Seconds to wait for in-flight calls to drain on shutdown before they
    /// are cancelled.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/quadrant.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub stream_buffer_size: usize,
    pub greet_repeat_count: u32,
    pub greet_interval: Duration,
    pub slow_greeting_delay: Duration,
    pub shutdown_timeout: Duration,
    pub server_addr: String,
    pub uds: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        if args.greet_repeat_count == 0 {
            bail!("GREET_REPEAT_COUNT must be greater than 0");
        }

        if args.server_addr.trim().is_empty() {
            bail!("SERVER_ADDR must not be empty");
        }

        Ok(Self {
            stream_buffer_size: args.stream_buffer_size,
            greet_repeat_count: args.greet_repeat_count,
            greet_interval: Duration::from_millis(args.greet_interval_ms),
            slow_greeting_delay: Duration::from_millis(args.slow_greeting_ms),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            server_addr: args.server_addr,
            uds: args.uds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let argv = core::iter::once("quadrant-server").chain(args.iter().copied());
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn explicit_flags_are_converted() {
        let config = parse(&[
            "--stream-buffer-size",
            "2",
            "--greet-repeat-count",
            "3",
            "--greet-interval-ms",
            "250",
            "--slow-greeting-ms",
            "1500",
            "--shutdown-timeout",
            "7",
            "--server-addr",
            "127.0.0.1:6000",
        ])
        .unwrap();

        assert_eq!(config.stream_buffer_size, 2);
        assert_eq!(config.greet_repeat_count, 3);
        assert_eq!(config.greet_interval, Duration::from_millis(250));
        assert_eq!(config.slow_greeting_delay, Duration::from_millis(1500));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(7));
        assert_eq!(config.server_addr, "127.0.0.1:6000");
        assert!(!config.uds);
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let err = parse(&["--stream-buffer-size", "0"]).unwrap_err();
        assert!(err.to_string().contains("STREAM_BUFFER_SIZE"));
    }

    #[test]
    fn zero_repeat_count_is_rejected() {
        let err = parse(&["--greet-repeat-count", "0"]).unwrap_err();
        assert!(err.to_string().contains("GREET_REPEAT_COUNT"));
    }

    #[test]
    fn uds_flag_is_parsed() {
        let config = parse(&["--uds", "--server-addr", "/tmp/quadrant.sock"]).unwrap();
        assert!(config.uds);
        assert_eq!(config.server_addr, "/tmp/quadrant.sock");
    }
}

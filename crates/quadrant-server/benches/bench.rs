use core::{fmt, hint::black_box, time::Duration};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::{StreamExt, stream::FuturesUnordered};
use quadrant_core::client::{Calculator, connect};
use quadrant_server::server::{app::serve_with_incoming, config::ServerConfig};
use std::time::Instant;
use tokio::{net::TcpListener, runtime::Builder, sync::oneshot};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{codec::CompressionEncoding, transport::Channel};

#[derive(Clone, Copy, Debug)]
enum Compression {
    None,
    Deflate,
    Gzip,
    Zstd,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Deflate => write!(f, "deflate"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

impl From<Compression> for Option<CompressionEncoding> {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => None,
            Compression::Deflate => Some(CompressionEncoding::Deflate),
            Compression::Gzip => Some(CompressionEncoding::Gzip),
            Compression::Zstd => Some(CompressionEncoding::Zstd),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct FactorBenchParams {
    n: i64,
    factors: u64,
    concurrency: usize,
    compression: Compression,
}

fn bench_config() -> ServerConfig {
    ServerConfig {
        stream_buffer_size: 64,
        greet_repeat_count: 1,
        greet_interval: Duration::ZERO,
        slow_greeting_delay: Duration::ZERO,
        shutdown_timeout: Duration::from_secs(1),
        server_addr: "127.0.0.1:0".to_string(),
        uds: false,
    }
}

fn grpc_bench(c: &mut Criterion) {
    let rt = Builder::new_multi_thread().enable_all().build().unwrap();

    // Serve in-process on an ephemeral port for the whole run.
    let (addr, stop) = rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        let (stop, stopped) = oneshot::channel::<()>();
        tokio::spawn(serve_with_incoming(
            TcpListenerStream::new(listener),
            bench_config(),
            async move {
                let _ = stopped.await;
            },
        ));
        (addr, stop)
    });
    let channel = rt.block_on(connect(addr)).expect("Failed to connect to server");

    // 2^40: many small factors. 600851475143: few factors, long searches.
    // 2^31 - 1: a single prime, the whole search budget.
    let n_cases = [(1_i64 << 40, 40), (600_851_475_143, 4), (2_147_483_647, 1)];
    let concurrency_cases = [1, 8, 32];
    let compression_cases = [
        Compression::None,
        Compression::Zstd,
        Compression::Gzip,
        Compression::Deflate,
    ];

    let mut cases = Vec::new();
    for &(n, factors) in &n_cases {
        for &concurrency in &concurrency_cases {
            for &compression in &compression_cases {
                cases.push(FactorBenchParams {
                    n,
                    factors,
                    concurrency,
                    compression,
                });
            }
        }
    }

    for params in &cases {
        let mut group = c.benchmark_group("grpc/prime_factors");
        group.throughput(Throughput::Elements(
            params.factors * params.concurrency as u64,
        ));

        group.bench_function(
            format!(
                "n/{}/conc/{}/comp/{}",
                params.n, params.concurrency, params.compression,
            ),
            |b| {
                b.to_async(&rt).iter_custom(|iters| {
                    let channel = channel.clone();
                    async move {
                        let start = Instant::now();
                        for _ in 0..iters {
                            run_factor_bench(&channel, params).await;
                        }
                        start.elapsed()
                    }
                });
            },
        );

        group.finish();
    }

    let mut group = c.benchmark_group("grpc/sum");
    group.bench_function("unary", |b| {
        b.to_async(&rt).iter_custom(|iters| {
            let mut calc = Calculator::new(channel.clone());
            async move {
                let start = Instant::now();
                for i in 0..iters {
                    black_box(calc.sum(i as i32, 1).await.unwrap());
                }
                start.elapsed()
            }
        });
    });
    group.finish();

    let _ = stop.send(());
}

async fn run_factor_bench(channel: &Channel, params: &FactorBenchParams) {
    let mut tasks = FuturesUnordered::new();

    for _ in 0..params.concurrency {
        let mut calc = Calculator::new(channel.clone());
        if let Some(encoding) = Option::<CompressionEncoding>::from(params.compression) {
            calc = calc.compressed(encoding);
        }
        let n = params.n;
        let expected = params.factors;

        tasks.push(tokio::spawn(async move {
            let mut factors = calc.prime_factors(n).await.expect("stream call failed");
            let mut received = 0;
            while let Some(factor) = factors.next().await {
                black_box(factor.expect("factor"));
                received += 1;
            }
            assert_eq!(received, expected, "missing factors for {n}");
        }));
    }

    while let Some(res) = tasks.next().await {
        res.unwrap();
    }
}

criterion_group!(grpc_benches, grpc_bench);
criterion_main!(grpc_benches);

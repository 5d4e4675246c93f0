//! Performance suite against a running gateway.
//!
//! Four phases share one HTTP client: sequential baseline, fixed concurrency,
//! paced load, and a stepped stress run that stops once errors pile up.

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, ValueEnum};
use futures::StreamExt;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::report;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const STRESS_LEVELS: &[usize] = &[1, 5, 10, 20, 30, 50];
const STRESS_ERROR_LIMIT: f64 = 0.1;

const BENCH_TEXTS: &[&str] = &[
    "这手机拍照真好看，我很喜欢！",
    "质量太差了，不推荐购买。",
    "这个产品的功能比较齐全，价格也合理。",
    "服务态度很好，物流也很快。",
    "价格有点贵，但是质量确实不错。",
    "不错",
    "这款手机的设计非常精美，外观时尚大气，手感也很好。",
    "屏幕显示效果清晰，色彩鲜艳，观看视频和玩游戏都很享受。",
    "拍照功能强大，夜景模式特别出色，能够拍出很清晰的照片。",
    "电池续航能力也不错，正常使用一天没问题。",
];

fn text_for(i: usize) -> &'static str {
    BENCH_TEXTS[i % BENCH_TEXTS.len()]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    All,
    Baseline,
    Concurrent,
    Load,
    Stress,
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Gateway base URL.
    #[arg(long, default_value = "http://localhost:5001")]
    pub base_url: String,

    #[arg(long, value_enum, default_value_t = Suite::All)]
    pub suite: Suite,

    /// Sequential requests in the baseline phase.
    #[arg(long, default_value_t = 10)]
    pub requests: usize,

    /// Total requests in the concurrent phase.
    #[arg(long, default_value_t = 50)]
    pub concurrent_requests: usize,

    /// Requests in flight during the concurrent phase.
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Load phase duration in seconds.
    #[arg(long, default_value_t = 30)]
    pub duration_secs: u64,

    /// Load phase requests per second.
    #[arg(long, default_value_t = 5)]
    pub rps: usize,

    /// Highest stress level to try.
    #[arg(long, default_value_t = 30)]
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ok { confidence: f64 },
    Failed(String),
}

/// One timed request.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub latency: Duration,
    pub outcome: Outcome,
}

impl Sample {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, Outcome::Ok { .. })
    }
}

/// Aggregate figures for one phase. Latencies are in milliseconds and cover
/// successful requests only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub error_rate: f64,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Successful requests per second of wall time; zero when not measured.
    pub throughput: f64,
}

impl BenchStats {
    pub fn from_samples(samples: &[Sample], wall: Option<Duration>) -> Self {
        let total = samples.len();
        let mut latencies: Vec<f64> = samples
            .iter()
            .filter(|s| s.is_ok())
            .map(|s| s.latency.as_secs_f64() * 1000.0)
            .collect();
        let successful = latencies.len();
        let failed = total - successful;

        if successful == 0 {
            return Self {
                total,
                failed,
                error_rate: 1.0,
                ..Self::default()
            };
        }

        latencies.sort_by(|a, b| a.total_cmp(b));
        let throughput = match wall {
            Some(w) if w > Duration::ZERO => successful as f64 / w.as_secs_f64(),
            _ => 0.0,
        };

        Self {
            total,
            successful,
            failed,
            error_rate: failed as f64 / total as f64,
            mean_ms: latencies.iter().sum::<f64>() / successful as f64,
            median_ms: percentile(&latencies, 50.0),
            p95_ms: percentile(&latencies, 95.0),
            min_ms: latencies[0],
            max_ms: latencies[successful - 1],
            throughput,
        }
    }
}

/// Linear interpolation between closest ranks. `sorted` must be ascending.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

pub struct Bencher {
    client: reqwest::Client,
    predict_url: String,
}

impl Bencher {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    pub async fn request(&self, text: &str) -> Sample {
        let start = Instant::now();
        let outcome = match self
            .client
            .post(&self.predict_url)
            .json(&json!({ "text": text }))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(body) => Outcome::Ok {
                    confidence: body["confidence"].as_f64().unwrap_or(0.0),
                },
                Err(e) => Outcome::Failed(e.to_string()),
            },
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                Outcome::Failed(format!("HTTP {status}: {body}"))
            }
            Err(e) => Outcome::Failed(e.to_string()),
        };
        let latency = start.elapsed();
        debug!(?latency, ok = matches!(outcome, Outcome::Ok { .. }), "bench request");
        Sample { latency, outcome }
    }

    /// Sequential requests; prints one line per request. No throughput.
    pub async fn baseline(&self, n: usize) -> BenchStats {
        let mut samples = Vec::with_capacity(n);
        for i in 0..n {
            let text = text_for(i);
            let sample = self.request(text).await;
            println!("{}", report::format_sample(i + 1, &sample, text));
            samples.push(sample);
        }
        BenchStats::from_samples(&samples, None)
    }

    /// `n` requests with at most `concurrency` in flight.
    pub async fn concurrent(&self, n: usize, concurrency: usize) -> BenchStats {
        let start = Instant::now();
        let samples: Vec<Sample> = futures::stream::iter(0..n)
            .map(|i| self.request(text_for(i)))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;
        BenchStats::from_samples(&samples, Some(start.elapsed()))
    }

    /// Bursts of `rps` concurrent requests once a second until `duration`
    /// has elapsed.
    pub async fn load(&self, duration: Duration, rps: usize) -> BenchStats {
        let start = Instant::now();
        let mut samples = Vec::new();
        while start.elapsed() < duration {
            let burst_start = Instant::now();
            let burst = futures::future::join_all((0..rps).map(|i| self.request(text_for(i)))).await;
            samples.extend(burst);
            if let Some(rest) = Duration::from_secs(1).checked_sub(burst_start.elapsed()) {
                tokio::time::sleep(rest).await;
            }
        }
        BenchStats::from_samples(&samples, Some(start.elapsed()))
    }

    /// Steps through the stress levels up to `max_concurrency`, sending twice
    /// the level in requests at each step.
    pub async fn stress(&self, max_concurrency: usize) -> Vec<(usize, BenchStats)> {
        let mut levels = Vec::new();
        for &level in STRESS_LEVELS.iter().take_while(|&&l| l <= max_concurrency) {
            println!("\nconcurrency {level}");
            let stats = self.concurrent(level * 2, level).await;
            let error_rate = stats.error_rate;
            levels.push((level, stats));
            if error_rate > STRESS_ERROR_LIMIT {
                warn!(level, error_rate, "error rate too high, stopping stress run");
                println!("error rate {:.1}% too high, stopping", error_rate * 100.0);
                break;
            }
        }
        levels
    }
}

pub async fn run(args: BenchArgs) -> anyhow::Result<()> {
    let bencher = Bencher::new(&args.base_url, REQUEST_TIMEOUT)?;
    print!("{}", report::header(&args.base_url, chrono::Local::now()));

    let all = args.suite == Suite::All;
    if all || args.suite == Suite::Baseline {
        println!("\nbaseline: {} sequential requests", args.requests);
        let stats = bencher.baseline(args.requests).await;
        print!("{}", report::format_stats("baseline", &stats));
    }
    if all || args.suite == Suite::Concurrent {
        println!(
            "\nconcurrent: {} requests, {} in flight",
            args.concurrent_requests, args.concurrency
        );
        let stats = bencher
            .concurrent(args.concurrent_requests, args.concurrency)
            .await;
        print!("{}", report::format_stats("concurrent", &stats));
    }
    if all || args.suite == Suite::Load {
        println!("\nload: {}s at {} requests/s", args.duration_secs, args.rps);
        let stats = bencher
            .load(Duration::from_secs(args.duration_secs), args.rps)
            .await;
        print!("{}", report::format_stats("load", &stats));
    }
    if all || args.suite == Suite::Stress {
        println!("\nstress: up to {} concurrent", args.max_concurrency);
        let levels = bencher.stress(args.max_concurrency).await;
        print!("{}", report::format_stress_summary(&levels));
    }
    Ok(())
}

use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, OnceLock},
};

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

#[derive(Default)]
struct MetricsState {
    total: u64,
    errors: u64,
    per_route: BTreeMap<&'static str, u64>,
    // (network, result) -> count，result 为 ok / invalid_account / transport
    balance_queries: BTreeMap<(String, &'static str), u64>,
    // 上游时延统计（毫秒）
    upstream_latency_sum_ms: u128,
    // 简易直方图分桶（毫秒）：<50, <100, <250, <500, <1000, >=1000
    upstream_hist_buckets: [u64; 6],
}

fn state() -> MutexGuard<'static, MetricsState> {
    let m = METRICS.get_or_init(|| Mutex::new(MetricsState::default()));
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    }
}

pub fn count_request(route: &'static str) {
    let mut s = state();
    s.total += 1;
    *s.per_route.entry(route).or_insert(0) += 1;
}

pub fn count_error() {
    state().errors += 1;
}

pub fn observe_balance_query(network: &str, result: &'static str, latency_ms: u128) {
    let mut s = state();
    *s.balance_queries
        .entry((network.to_string(), result))
        .or_insert(0) += 1;
    s.upstream_latency_sum_ms += latency_ms;
    let b = match latency_ms {
        0..=49 => 0,
        50..=99 => 1,
        100..=249 => 2,
        250..=499 => 3,
        500..=999 => 4,
        _ => 5,
    };
    s.upstream_hist_buckets[b] += 1;
}

pub fn render_prometheus() -> String {
    let s = state();
    let mut out = String::new();
    out.push_str("# HELP solbalance_requests_total Total requests\n");
    out.push_str("# TYPE solbalance_requests_total counter\n");
    out.push_str(&format!("solbalance_requests_total {}\n", s.total));

    out.push_str("# HELP solbalance_errors_total Total error responses\n");
    out.push_str("# TYPE solbalance_errors_total counter\n");
    out.push_str(&format!("solbalance_errors_total {}\n", s.errors));

    out.push_str("# HELP solbalance_route_requests_total Requests per route\n");
    out.push_str("# TYPE solbalance_route_requests_total counter\n");
    for (k, v) in s.per_route.iter() {
        out.push_str(&format!(
            "solbalance_route_requests_total{{route=\"{}\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP solbalance_balance_queries_total Balance queries per network and result\n");
    out.push_str("# TYPE solbalance_balance_queries_total counter\n");
    for ((network, result), v) in s.balance_queries.iter() {
        out.push_str(&format!(
            "solbalance_balance_queries_total{{network=\"{}\",result=\"{}\"}} {}\n",
            network, result, v
        ));
    }

    out.push_str("# HELP solbalance_upstream_latency_ms_sum Sum of upstream latency in ms\n");
    out.push_str("# TYPE solbalance_upstream_latency_ms_sum counter\n");
    out.push_str(&format!(
        "solbalance_upstream_latency_ms_sum {}\n",
        s.upstream_latency_sum_ms
    ));

    out.push_str("# HELP solbalance_upstream_latency_ms_bucket Upstream latency histogram buckets\n");
    out.push_str("# TYPE solbalance_upstream_latency_ms_bucket histogram\n");
    let bounds = [50, 100, 250, 500, 1000];
    let mut cumulative = 0u64;
    for (i, bound) in bounds.iter().enumerate() {
        cumulative += s.upstream_hist_buckets[i];
        out.push_str(&format!(
            "solbalance_upstream_latency_ms_bucket{{le=\"{}\"}} {}\n",
            bound, cumulative
        ));
    }
    out.push_str(&format!(
        "solbalance_upstream_latency_ms_bucket{{le=\"+Inf\"}} {}\n",
        s.upstream_hist_buckets.iter().sum::<u64>()
    ));

    out
}

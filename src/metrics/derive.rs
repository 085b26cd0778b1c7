// Derive normalized metrics from a raw one-shot Docker stats sample.

use bollard::models::ContainerStatsResponse;

use crate::models::DerivedMetrics;

/// Turn one raw sample into DerivedMetrics. Returns None when the sample
/// carries no usable cpu/precpu sections (the entry is dropped from the
/// aggregate, never a placeholder). Exposed for unit tests.
///
/// Delta convention pinned against a captured engine sample: current minus
/// previous, clamped to 0 whenever the system delta is not positive or the
/// cpu delta is negative (engine reported no progress).
pub(crate) fn derive_metrics(s: &ContainerStatsResponse, name: &str) -> Option<DerivedMetrics> {
    let cpu_stats = s.cpu_stats.as_ref()?;
    let precpu_stats = s.precpu_stats.as_ref()?;

    let cpu_usage = cpu_stats.cpu_usage.as_ref()?;
    let precpu_usage = precpu_stats.cpu_usage.as_ref()?;

    let cpu_delta =
        cpu_usage.total_usage.unwrap_or(0) as i64 - precpu_usage.total_usage.unwrap_or(0) as i64;
    let system_delta = cpu_stats.system_cpu_usage.unwrap_or(0) as i64
        - precpu_stats.system_cpu_usage.unwrap_or(0) as i64;
    let online_cpus = cpu_stats.online_cpus.unwrap_or(1);
    let cpu_percent = if system_delta > 0 && cpu_delta >= 0 {
        (cpu_delta as f64 / system_delta as f64) * online_cpus as f64 * 100.0
    } else {
        0.0
    };

    let memory_bytes = s.memory_stats.as_ref().and_then(|m| m.usage).unwrap_or(0);
    let memory_limit_bytes = s.memory_stats.as_ref().and_then(|m| m.limit).unwrap_or(0);
    let mem_percent = if memory_limit_bytes > 0 {
        round2(memory_bytes as f64 / memory_limit_bytes as f64 * 100.0)
    } else {
        0.0
    };

    let (net_in, net_out) = s.networks.as_ref().map_or((0u64, 0u64), |n| {
        let mut rx = 0u64;
        let mut tx = 0u64;
        for v in n.values() {
            rx += v.rx_bytes.unwrap_or(0);
            tx += v.tx_bytes.unwrap_or(0);
        }
        (rx, tx)
    });

    let (blk_read, blk_write) = s
        .blkio_stats
        .as_ref()
        .and_then(|b| b.io_service_bytes_recursive.as_ref())
        .map_or((0u64, 0u64), |entries| {
            let mut read = 0u64;
            let mut write = 0u64;
            for e in entries {
                if e.op
                    .as_ref()
                    .is_some_and(|op| op.eq_ignore_ascii_case("read"))
                {
                    read += e.value.unwrap_or(0);
                } else if e
                    .op
                    .as_ref()
                    .is_some_and(|op| op.eq_ignore_ascii_case("write"))
                {
                    write += e.value.unwrap_or(0);
                }
            }
            (read, write)
        });

    // The engine stamps each sample with its own read time; derivation
    // wall-clock is only a fallback for samples without one.
    let timestamp = s
        .read
        .map(|t| t.timestamp_millis())
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    Some(DerivedMetrics {
        container_name: name.to_string(),
        cpu_percent,
        online_cpus,
        memory_bytes,
        memory_limit_bytes,
        mem_percent,
        blk_read,
        blk_write,
        net_in,
        net_out,
        timestamp,
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

//! Map: pure conversions from runtime API models to stored records.

use bollard::models::{
    ContainerStatsResponse, ContainerSummary, ImageSummary, Network, Volume,
};
use chrono::Utc;

use crate::model::{Container, ContainerImage, ContainerNetwork, ContainerStat, ContainerVolume};

pub fn container(device_uuid: &str, s: ContainerSummary) -> Container {
    Container {
        id: s.id.unwrap_or_default(),
        device_uuid: device_uuid.to_string(),
        name: s
            .names
            .as_deref()
            .and_then(|n| n.first())
            .map(|n| n.trim_start_matches('/'))
            .unwrap_or("unknown")
            .to_string(),
        custom_name: None,
        image: s.image.unwrap_or_default(),
        state: s
            .state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".into()),
        status: s.status.unwrap_or_default(),
        labels: s.labels.unwrap_or_default(),
        created: s.created.unwrap_or_default(),
        updated_at: Utc::now(),
    }
}

pub fn image(device_uuid: &str, s: ImageSummary) -> ContainerImage {
    ContainerImage {
        id: s.id,
        device_uuid: device_uuid.to_string(),
        repo_tags: s.repo_tags,
        size: s.size,
        created: s.created,
        containers: s.containers,
    }
}

pub fn volume(device_uuid: &str, v: Volume) -> ContainerVolume {
    ContainerVolume {
        name: v.name,
        device_uuid: device_uuid.to_string(),
        driver: v.driver,
        mountpoint: v.mountpoint,
        scope: v.scope.map(|s| s.to_string()),
        created_at: v.created_at,
    }
}

pub fn network(device_uuid: &str, n: Network) -> ContainerNetwork {
    ContainerNetwork {
        id: n.id.unwrap_or_default(),
        device_uuid: device_uuid.to_string(),
        name: n.name.unwrap_or_default(),
        driver: n.driver,
        scope: n.scope,
        internal: n.internal.unwrap_or(false),
        attachable: n.attachable.unwrap_or(false),
        ingress: n.ingress.unwrap_or(false),
        enable_ipv6: n.enable_ipv6.unwrap_or(false),
        created: n.created,
    }
}

pub fn stat(device_uuid: &str, container_id: &str, stats: &ContainerStatsResponse) -> ContainerStat {
    let (memory_usage, memory_limit) = stats
        .memory_stats
        .as_ref()
        .map(|m| (m.usage.unwrap_or(0), m.limit.unwrap_or(0)))
        .unwrap_or((0, 0));
    let memory_percent = if memory_limit > 0 {
        (memory_usage as f64 / memory_limit as f64) * 100.0
    } else {
        0.0
    };

    let (net_rx_bytes, net_tx_bytes) = stats
        .networks
        .as_ref()
        .map(|networks| {
            networks.values().fold((0u64, 0u64), |(rx, tx), n| {
                (
                    rx.saturating_add(n.rx_bytes.unwrap_or(0)),
                    tx.saturating_add(n.tx_bytes.unwrap_or(0)),
                )
            })
        })
        .unwrap_or((0, 0));

    ContainerStat {
        device_uuid: device_uuid.to_string(),
        container_id: container_id.to_string(),
        cpu_percent: calculate_cpu_percentage(stats),
        memory_usage,
        memory_limit,
        memory_percent,
        net_rx_bytes,
        net_tx_bytes,
        sampled_at: Utc::now(),
    }
}

/// Calculate CPU percentage from Docker stats
/// Formula: ((total_usage_delta / system_usage_delta) * num_cpus) * 100
pub fn calculate_cpu_percentage(stats: &ContainerStatsResponse) -> f64 {
    let (Some(cpu_stats), Some(precpu_stats)) = (&stats.cpu_stats, &stats.precpu_stats) else {
        return 0.0;
    };

    let total = |s: &bollard::models::ContainerCpuStats| {
        s.cpu_usage.as_ref().and_then(|u| u.total_usage).unwrap_or(0)
    };
    let cpu_delta = total(cpu_stats).saturating_sub(total(precpu_stats)) as f64;
    let system_delta = cpu_stats
        .system_cpu_usage
        .unwrap_or(0)
        .saturating_sub(precpu_stats.system_cpu_usage.unwrap_or(0)) as f64;

    if system_delta > 0.0 && cpu_delta > 0.0 {
        let num_cpus = cpu_stats.online_cpus.unwrap_or(1).max(1) as f64;
        let pct = (cpu_delta / system_delta) * num_cpus * 100.0;
        if pct.is_finite() { pct } else { 0.0 }
    } else {
        0.0
    }
}

//! Host resource-limit discovery for the spawned transform tool.
//!
//! A pure environment query, evaluated once at startup and passed into
//! command building as a plain value. Recomputing it is harmless.

/// Cgroup-derived caps forwarded to the transform tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Memory cap in megabytes, if the host imposes one.
    pub max_memory_mb: Option<u64>,
    /// CPU core cap, if the host imposes one.
    pub max_cores: Option<u32>,
}

impl ResourceLimits {
    /// Extra command arguments for the discovered caps.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(memory) = self.max_memory_mb {
            args.push(format!("--maxMemory={memory}"));
        }
        if let Some(cores) = self.max_cores {
            args.push(format!("--maxCores={cores}"));
        }
        args
    }
}

/// Query the host's cgroup limits. Unlimited or undetectable caps are None.
pub fn detect_resource_limits() -> ResourceLimits {
    #[cfg(target_os = "linux")]
    {
        ResourceLimits {
            max_memory_mb: detect_memory_limit_mb(),
            max_cores: detect_cpu_limit(),
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        ResourceLimits::default()
    }
}

#[cfg(target_os = "linux")]
fn detect_memory_limit_mb() -> Option<u64> {
    // cgroup v2, then v1
    for path in [
        "/sys/fs/cgroup/memory.max",
        "/sys/fs/cgroup/memory/memory.limit_in_bytes",
    ] {
        if let Ok(raw) = std::fs::read_to_string(path) {
            if let Some(mb) = parse_memory_limit(&raw) {
                return Some(mb);
            }
        }
    }
    None
}

#[cfg(target_os = "linux")]
fn detect_cpu_limit() -> Option<u32> {
    if let Ok(raw) = std::fs::read_to_string("/sys/fs/cgroup/cpu.max") {
        if let Some(cores) = parse_cpu_max(&raw) {
            return Some(cores);
        }
    }
    for path in [
        "/sys/fs/cgroup/cpuset.cpus.effective",
        "/sys/fs/cgroup/cpuset/cpuset.cpus",
    ] {
        if let Ok(raw) = std::fs::read_to_string(path) {
            if let Some(cores) = parse_cpuset_list(&raw) {
                return Some(cores);
            }
        }
    }
    None
}

/// Parse a cgroup memory limit in bytes; "max" and the v1 no-limit sentinel
/// (a value near u64::MAX) both mean unconstrained.
#[allow(dead_code)]
fn parse_memory_limit(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw == "max" {
        return None;
    }
    let bytes: u64 = raw.parse().ok()?;
    if bytes >= 1 << 60 {
        return None;
    }
    Some(bytes / (1024 * 1024))
}

/// Parse cgroup v2 `cpu.max`: "<quota> <period>" or "max <period>".
#[allow(dead_code)]
fn parse_cpu_max(raw: &str) -> Option<u32> {
    let mut parts = raw.trim().split_whitespace();
    let quota = parts.next()?;
    if quota == "max" {
        return None;
    }
    let quota: f64 = quota.parse().ok()?;
    let period: f64 = parts.next()?.parse().ok()?;
    if period <= 0.0 {
        return None;
    }
    let cores = (quota / period).ceil() as u32;
    (cores > 0).then_some(cores)
}

/// Count CPUs in a cpuset list such as "0-3,8".
#[allow(dead_code)]
fn parse_cpuset_list(raw: &str) -> Option<u32> {
    let mut count = 0u32;
    for part in raw.trim().split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().ok()?;
                let end: u32 = end.trim().parse().ok()?;
                if end < start {
                    return None;
                }
                count += end - start + 1;
            }
            None => {
                part.parse::<u32>().ok()?;
                count += 1;
            }
        }
    }
    (count > 0).then_some(count)
}

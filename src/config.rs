use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::dns::MAX_PACKET_LEN;
use crate::error::ConfigError;
use crate::synth::Dns64Prefix;

/// Upstream queries always go to the DNS port; only the listener port is
/// configurable.
pub const UPSTREAM_DNS_PORT: u16 = 53;

/// Bytes of a configuration line that are considered; the rest of an
/// overlong line is discarded.
const MAX_LINE_LEN: usize = 255;

/// `nameserver default` pulls in /etc/resolv.conf, which may itself say
/// `default`; the include depth is capped rather than recursing forever.
const MAX_INCLUDE_DEPTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionMode {
    Random,
    RoundRobin,
}

/// Resolver configuration, immutable after load.
#[derive(Clone, Debug)]
pub struct DnsConfig {
    /// UDP port the IPv6 listener binds.
    pub port: u16,
    /// Upstream recursive resolvers, tried on `UPSTREAM_DNS_PORT`.
    pub nameservers: Vec<Ipv4Addr>,
    pub selection_mode: SelectionMode,
    /// Per-attempt upstream receive timeout.
    pub timeout: Duration,
    /// Additional attempts after the first.
    pub resend_attempts: u16,
    /// Size of the worker pool.
    pub num_threads: usize,
    /// Datagram buffer capacity; replies that would outgrow it are dropped.
    pub response_maxlength: usize,
    pub prefix: Dns64Prefix,
    pub debug: bool,
    /// Port the upstream client sends to. Fixed in production; tests point it
    /// at a loopback mock.
    pub upstream_port: u16,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            port: 53,
            nameservers: Vec::new(),
            selection_mode: SelectionMode::Random,
            timeout: Duration::from_secs(1),
            resend_attempts: 2,
            num_threads: 10,
            response_maxlength: MAX_PACKET_LEN,
            prefix: Dns64Prefix::new("64:ff9b::".parse().unwrap(), 96)
                .expect("well-known prefix is valid"),
            debug: false,
            upstream_port: UPSTREAM_DNS_PORT,
        }
    }
}

impl DnsConfig {
    /// Load the resolver configuration. Bad values for non-critical keys log
    /// a warning and fall back to the default; a missing file, a missing or
    /// bad `dns64-prefix`, or an empty nameserver list abort startup.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = DnsConfig::default();
        let mut saw_prefix = false;
        apply_resolver_file(path.as_ref(), &mut config, &mut saw_prefix, 0)?;
        if !saw_prefix {
            return Err(ConfigError::InvalidPrefix(
                "the dns64-prefix key is required".to_string(),
            ));
        }
        if config.nameservers.is_empty() {
            return Err(ConfigError::NoNameservers);
        }
        Ok(config)
    }
}

fn apply_resolver_file(
    path: &Path,
    config: &mut DnsConfig,
    saw_prefix: &mut bool,
    depth: usize,
) -> Result<(), ConfigError> {
    for (lineno, key, value) in read_directives(path)? {
        match key.as_str() {
            "nameserver" => {
                if value == "default" {
                    if depth >= MAX_INCLUDE_DEPTH {
                        warn!(
                            "Ignoring 'nameserver default' at line {}: include depth exceeded",
                            lineno
                        );
                        continue;
                    }
                    apply_resolver_file(
                        Path::new("/etc/resolv.conf"),
                        config,
                        saw_prefix,
                        depth + 1,
                    )?;
                } else {
                    match value.parse::<Ipv4Addr>() {
                        Ok(addr) => config.nameservers.push(addr),
                        Err(_) => warn!("Invalid ip address at line {}", lineno),
                    }
                }
            }
            "selection-mode" => {
                config.selection_mode = match value.as_str() {
                    "random" => SelectionMode::Random,
                    "round-robin" => SelectionMode::RoundRobin,
                    _ => {
                        warn!(
                            "Invalid selection-mode at line {}, defaulting to \"random\"",
                            lineno
                        );
                        SelectionMode::Random
                    }
                };
            }
            "dns64-prefix" => {
                config.prefix = value.parse()?;
                *saw_prefix = true;
            }
            "timeout-time" => {
                config.timeout = match parse_timeout(&value) {
                    Some(timeout) => timeout,
                    None => {
                        warn!(
                            "Invalid timeout-time at line {}. Defaulting to 1.0 sec",
                            lineno
                        );
                        Duration::from_secs(1)
                    }
                };
            }
            "resend-attempts" => {
                config.resend_attempts = value.parse().unwrap_or_else(|_| {
                    warn!("Invalid resend-attempts at line {}. Defaulting to 2", lineno);
                    2
                });
            }
            "num-threads" => {
                config.num_threads = value.parse().unwrap_or_else(|_| {
                    warn!("Invalid num-threads at line {}. Defaulting to 10", lineno);
                    10
                });
            }
            "response-maxlength" => {
                config.response_maxlength = value.parse().unwrap_or_else(|_| {
                    warn!(
                        "Invalid response-maxlength at line {}. Defaulting to 512",
                        lineno
                    );
                    MAX_PACKET_LEN
                });
            }
            "port" => {
                config.port = value.parse().unwrap_or_else(|_| {
                    warn!("Invalid port at line {}. Defaulting to 53", lineno);
                    53
                });
            }
            "debugging" => config.debug = value == "yes",
            _ => {}
        }
    }
    Ok(())
}

/// `SEC.USEC` with 0 <= SEC <= 32767 and 0 <= USEC <= 999999. Both parts are
/// plain integers, so `1.5` means one second and five microseconds.
fn parse_timeout(value: &str) -> Option<Duration> {
    let (sec, usec) = value.split_once('.')?;
    let sec: u64 = sec.parse().ok()?;
    let usec: u64 = usec.parse().ok()?;
    if sec > 32767 || usec > 999_999 {
        return None;
    }
    Some(Duration::new(sec, (usec * 1000) as u32))
}

/// The fake server's `have-AAAA` switch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AaaaMode {
    Yes,
    No,
    Probability(f64),
}

/// Fake-server configuration.
#[derive(Clone, Debug)]
pub struct FakeConfig {
    pub port: u16,
    pub num_threads: usize,
    pub aaaa_mode: AaaaMode,
    pub prefix: Dns64Prefix,
    pub debug: bool,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            port: 53,
            num_threads: 10,
            aaaa_mode: AaaaMode::No,
            prefix: Dns64Prefix::new("2001:db8::".parse().unwrap(), 96)
                .expect("documentation prefix is valid"),
            debug: false,
        }
    }
}

impl FakeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = FakeConfig::default();
        for (lineno, key, value) in read_directives(path.as_ref())? {
            match key.as_str() {
                "have-AAAA" => {
                    config.aaaa_mode = if value == "1" {
                        AaaaMode::Yes
                    } else if value == "0" {
                        AaaaMode::No
                    } else {
                        match value.parse::<f64>() {
                            Ok(p) if (0.0..=1.0).contains(&p) => AaaaMode::Probability(p),
                            _ => {
                                warn!("Invalid have-AAAA at line {}. Defaulting to 0", lineno);
                                AaaaMode::No
                            }
                        }
                    };
                }
                "dns64-prefix" => config.prefix = value.parse()?,
                "num-threads" => {
                    config.num_threads = value.parse().unwrap_or_else(|_| {
                        warn!("Invalid num-threads at line {}. Defaulting to 10", lineno);
                        10
                    });
                }
                "port" => {
                    config.port = value.parse().unwrap_or_else(|_| {
                        warn!("Invalid port at line {}. Defaulting to 53", lineno);
                        53
                    });
                }
                "debug" => config.debug = value == "yes",
                _ => {}
            }
        }
        Ok(config)
    }
}

/// Read a line-oriented `key value` file: `#` and `//` start full-line
/// comments, lines are truncated at 255 bytes, unknown keys are the caller's
/// business. Returns `(line number, key, value)` triples.
fn read_directives(path: &Path) -> Result<Vec<(usize, String, String)>, ConfigError> {
    let raw = std::fs::read(path).map_err(|source| ConfigError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;

    let mut directives = Vec::new();
    for (idx, line) in raw.split(|&b| b == b'\n').enumerate() {
        let line = &line[..line.len().min(MAX_LINE_LEN)];
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.len() < 3 || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        match line.split_once(char::is_whitespace) {
            Some((key, value)) => {
                directives.push((idx + 1, key.to_string(), value.trim().to_string()))
            }
            None => warn!(
                "Ignoring malformed line {} in {}: {:?}",
                idx + 1,
                path.display(),
                line
            ),
        }
    }
    Ok(directives)
}
